//! Report header and outbound chunking.
//!
//! Report format (32 bytes):
//! - REPORT ID (1 byte): always 0x05
//! - CMD (1 byte): command identifier
//! - SIZE (2 bytes): total logical payload length
//! - CHUNK SIZE (1 byte): payload bytes in this chunk
//! - CHUNK OFFSET (2 bytes): byte offset of this chunk in the payload
//! - CRC (1 byte): reserved, written as zero
//! - DATA (24 bytes): chunk payload, zero padded

use crate::ProtocolError;

/// HID report id of the control interface
pub const REPORT_ID: u8 = 0x05;

/// Size of one HID report including the report id
pub const REPORT_SIZE: usize = 32;

/// Size of the chunk header
pub const HEADER_SIZE: usize = 8;

/// Payload bytes that fit after the header in one report
pub const CHUNK_DATA_SIZE: usize = REPORT_SIZE - HEADER_SIZE;

/// Largest logical payload accepted or produced
pub const MAX_MESSAGE_SIZE: usize = 1280;

/// Chunk header, present at the start of every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub report_id: u8,
    pub cmd: u8,
    /// Total logical payload length
    pub size: u16,
    /// Payload bytes carried by this chunk
    pub chunk_size: u8,
    pub chunk_offset: u16,
    pub crc: u8,
}

impl Header {
    /// Decode a header from the start of a report
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::Truncated);
        }
        Ok(Self {
            report_id: bytes[0],
            cmd: bytes[1],
            size: u16::from_le_bytes([bytes[2], bytes[3]]),
            chunk_size: bytes[4],
            chunk_offset: u16::from_le_bytes([bytes[5], bytes[6]]),
            crc: bytes[7],
        })
    }

    /// Encode this header into the first `HEADER_SIZE` bytes of `buffer`
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        if buffer.len() < HEADER_SIZE {
            return Err(ProtocolError::PayloadTooLarge);
        }
        buffer[0] = self.report_id;
        buffer[1] = self.cmd;
        buffer[2..4].copy_from_slice(&self.size.to_le_bytes());
        buffer[4] = self.chunk_size;
        buffer[5..7].copy_from_slice(&self.chunk_offset.to_le_bytes());
        buffer[7] = self.crc;
        Ok(HEADER_SIZE)
    }
}

/// Splits one logical message into ready-to-send reports
///
/// Yields one report per chunk of at most [`CHUNK_DATA_SIZE`] bytes. An
/// empty payload still yields a single header-only report.
#[derive(Debug, Clone)]
pub struct ReportChunks<'a> {
    cmd: u8,
    payload: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> ReportChunks<'a> {
    /// Create a chunk iterator over `payload`
    pub fn new(cmd: u8, payload: &'a [u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::PayloadTooLarge);
        }
        Ok(Self {
            cmd,
            payload,
            offset: 0,
            done: false,
        })
    }

    /// Number of reports this message needs
    pub fn report_count(&self) -> usize {
        self.payload.len().div_ceil(CHUNK_DATA_SIZE).max(1)
    }
}

impl Iterator for ReportChunks<'_> {
    type Item = [u8; REPORT_SIZE];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let remaining = self.payload.len() - self.offset;
        let chunk_len = remaining.min(CHUNK_DATA_SIZE);

        let header = Header {
            report_id: REPORT_ID,
            cmd: self.cmd,
            size: self.payload.len() as u16,
            chunk_size: chunk_len as u8,
            chunk_offset: self.offset as u16,
            crc: 0,
        };

        let mut report = [0u8; REPORT_SIZE];
        // Report is always large enough for the header
        let _ = header.encode(&mut report);
        report[HEADER_SIZE..HEADER_SIZE + chunk_len]
            .copy_from_slice(&self.payload[self.offset..self.offset + chunk_len]);

        self.offset += chunk_len;
        if self.offset >= self.payload.len() {
            self.done = true;
        }
        Some(report)
    }
}
