//! Reassembly of chunked control messages.
//!
//! A message arrives as a sequence of chunks. Each chunk starts with a
//! [`Header`] followed by up to `min(chunk_size, CHUNK_DATA_SIZE)` payload
//! bytes. A transport may split one chunk over several pieces; pieces after
//! the first carry raw payload bytes only, until the chunk window is full.

use heapless::Vec;

use crate::report::{Header, CHUNK_DATA_SIZE, HEADER_SIZE, MAX_MESSAGE_SIZE, REPORT_ID};
use crate::ProtocolError;

/// A fully reassembled logical message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw command byte from the header
    pub cmd: u8,
    /// Logical payload, exactly `size` bytes long
    pub payload: Vec<u8, MAX_MESSAGE_SIZE>,
}

/// Reassembles chunked reports into [`Message`]s
///
/// Single writer: one task feeds pieces in arrival order. The completed
/// message is moved out to the caller, so the assembler can keep accepting
/// pieces while the message is being handled.
#[derive(Debug, Default)]
pub struct ReportAssembler {
    /// Header of the message being assembled, `None` when idle
    current: Option<Header>,
    payload: Vec<u8, MAX_MESSAGE_SIZE>,
    /// Bytes still expected in the open chunk window, `None` when the next
    /// piece must start with a header
    window_left: Option<usize>,
}

impl ReportAssembler {
    /// Create an idle assembler
    pub const fn new() -> Self {
        Self {
            current: None,
            payload: Vec::new(),
            window_left: None,
        }
    }

    /// Drop any partially assembled message
    pub fn reset(&mut self) {
        self.current = None;
        self.payload.clear();
        self.window_left = None;
    }

    /// Whether a message is partially assembled
    pub fn in_progress(&self) -> bool {
        self.current.is_some()
    }

    /// Feed one transport piece
    ///
    /// Returns `Ok(Some(message))` when the message is complete,
    /// `Ok(None)` when more pieces are needed, or `Err` when the piece is
    /// rejected. Errors reset the assembler.
    pub fn feed(&mut self, piece: &[u8]) -> Result<Option<Message>, ProtocolError> {
        match self.accept(piece) {
            Ok(()) => {}
            Err(e) => {
                self.reset();
                return Err(e);
            }
        }

        let Some(header) = self.current else {
            return Ok(None);
        };

        if self.payload.len() >= header.size as usize {
            let message = Message {
                cmd: header.cmd,
                payload: core::mem::take(&mut self.payload),
            };
            self.reset();
            return Ok(Some(message));
        }

        Ok(None)
    }

    fn accept(&mut self, piece: &[u8]) -> Result<(), ProtocolError> {
        let (data, window) = match self.window_left {
            Some(left) => (piece, left),
            None => {
                let header = Header::decode(piece)?;
                if header.report_id != REPORT_ID {
                    return Err(ProtocolError::BadReportId);
                }

                if self.current.is_none() {
                    if header.size as usize > MAX_MESSAGE_SIZE {
                        return Err(ProtocolError::OutOfMemory);
                    }
                    self.payload.clear();
                    self.current = Some(header);
                }

                let window = (header.chunk_size as usize).min(CHUNK_DATA_SIZE);
                (&piece[HEADER_SIZE..], window)
            }
        };

        let total = self.current.map(|h| h.size as usize).unwrap_or(0);
        let remaining = total.saturating_sub(self.payload.len());
        let count = window.min(data.len()).min(remaining);

        self.payload
            .extend_from_slice(&data[..count])
            .map_err(|_| ProtocolError::OutOfMemory)?;

        let left = window - count;
        self.window_left = if left == 0 { None } else { Some(left) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportChunks, REPORT_SIZE};
    use proptest::prelude::*;

    fn feed_all(assembler: &mut ReportAssembler, pieces: &[&[u8]]) -> Option<Message> {
        let mut out = None;
        for piece in pieces {
            if let Some(message) = assembler.feed(piece).unwrap() {
                assert!(out.is_none(), "message completed twice");
                out = Some(message);
            }
        }
        out
    }

    #[test]
    fn test_single_report_message() {
        let mut report = [0u8; REPORT_SIZE];
        report[..HEADER_SIZE].copy_from_slice(&[0x05, 0x12, 4, 0, 4, 0, 0, 0]);
        report[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&[0x01, 0x00, 0x73, 0x00]);

        let mut assembler = ReportAssembler::new();
        let message = assembler.feed(&report).unwrap().unwrap();

        assert_eq!(message.cmd, 0x12);
        assert_eq!(&message.payload[..], &[0x01, 0x00, 0x73, 0x00]);
        assert!(!assembler.in_progress());
    }

    #[test]
    fn test_empty_message_completes_immediately() {
        let report = [0x05, 0x01, 0, 0, 0, 0, 0, 0];
        let mut assembler = ReportAssembler::new();
        let message = assembler.feed(&report).unwrap().unwrap();
        assert_eq!(message.cmd, 0x01);
        assert!(message.payload.is_empty());
    }

    #[test]
    fn test_multi_report_message() {
        let payload: Vec<u8, 64> = (0..50u8).collect();
        let mut assembler = ReportAssembler::new();
        let mut result = None;

        for report in ReportChunks::new(0x11, &payload).unwrap() {
            assert!(result.is_none());
            result = assembler.feed(&report).unwrap();
        }

        let message = result.unwrap();
        assert_eq!(message.cmd, 0x11);
        assert_eq!(&message.payload[..], &payload[..]);
    }

    #[test]
    fn test_chunk_split_across_pieces() {
        // One 20-byte chunk delivered as header + 5 bytes, then 10, then 5
        let payload: Vec<u8, 20> = (100..120u8).collect();
        let mut first = Vec::<u8, 32>::new();
        first
            .extend_from_slice(&[0x05, 0x11, 20, 0, 20, 0, 0, 0])
            .unwrap();
        first.extend_from_slice(&payload[..5]).unwrap();

        let mut assembler = ReportAssembler::new();
        let message = feed_all(
            &mut assembler,
            &[&first, &payload[5..15], &payload[15..20]],
        )
        .unwrap();
        assert_eq!(&message.payload[..], &payload[..]);
    }

    #[test]
    fn test_header_only_piece_keeps_window_open() {
        let mut assembler = ReportAssembler::new();
        assert_eq!(
            assembler.feed(&[0x05, 0x11, 3, 0, 3, 0, 0, 0]).unwrap(),
            None
        );
        let message = assembler.feed(&[7, 8, 9]).unwrap().unwrap();
        assert_eq!(&message.payload[..], &[7, 8, 9]);
    }

    #[test]
    fn test_short_chunk_then_next_header() {
        // A chunk shorter than the report data area closes its window early
        let mut assembler = ReportAssembler::new();
        assert_eq!(
            assembler
                .feed(&[0x05, 0x11, 6, 0, 2, 0, 0, 0, 0xA1, 0xA2])
                .unwrap(),
            None
        );
        let message = assembler
            .feed(&[0x05, 0x11, 6, 0, 4, 2, 0, 0, 0xB1, 0xB2, 0xB3, 0xB4])
            .unwrap()
            .unwrap();
        assert_eq!(&message.payload[..], &[0xA1, 0xA2, 0xB1, 0xB2, 0xB3, 0xB4]);
    }

    #[test]
    fn test_padding_ignored() {
        let mut report = [0xFFu8; REPORT_SIZE];
        report[..HEADER_SIZE].copy_from_slice(&[0x05, 0x12, 2, 0, 2, 0, 0, 0]);
        report[HEADER_SIZE] = 1;
        report[HEADER_SIZE + 1] = 2;

        let mut assembler = ReportAssembler::new();
        let message = assembler.feed(&report).unwrap().unwrap();
        assert_eq!(&message.payload[..], &[1, 2]);
    }

    #[test]
    fn test_bad_report_id() {
        let mut assembler = ReportAssembler::new();
        let result = assembler.feed(&[0x06, 0x11, 2, 0, 2, 0, 0, 0, 1, 2]);
        assert_eq!(result, Err(ProtocolError::BadReportId));
        assert!(!assembler.in_progress());
    }

    #[test]
    fn test_truncated_first_piece() {
        let mut assembler = ReportAssembler::new();
        assert_eq!(
            assembler.feed(&[0x05, 0x11, 2]),
            Err(ProtocolError::Truncated)
        );
    }

    #[test]
    fn test_oversized_message_rejected() {
        let size = (MAX_MESSAGE_SIZE as u16 + 1).to_le_bytes();
        let mut assembler = ReportAssembler::new();
        let result = assembler.feed(&[0x05, 0x11, size[0], size[1], 24, 0, 0, 0]);
        assert_eq!(result, Err(ProtocolError::OutOfMemory));
        assert!(!assembler.in_progress());
    }

    #[test]
    fn test_recovers_after_error() {
        let mut assembler = ReportAssembler::new();
        assert!(assembler.feed(&[0x00; 4]).is_err());

        let message = assembler
            .feed(&[0x05, 0x01, 0, 0, 0, 0, 0, 0])
            .unwrap()
            .unwrap();
        assert_eq!(message.cmd, 0x01);
    }

    #[test]
    fn test_back_to_back_messages() {
        let mut assembler = ReportAssembler::new();
        let a = assembler
            .feed(&[0x05, 0x12, 1, 0, 1, 0, 0, 0, 0xAA])
            .unwrap()
            .unwrap();
        let b = assembler
            .feed(&[0x05, 0x11, 1, 0, 1, 0, 0, 0, 0xBB])
            .unwrap()
            .unwrap();
        assert_eq!((a.cmd, a.payload[0]), (0x12, 0xAA));
        assert_eq!((b.cmd, b.payload[0]), (0x11, 0xBB));
    }

    proptest! {
        /// Splitting each chunk into arbitrary transport pieces yields the
        /// same message as feeding whole reports.
        #[test]
        fn test_reassembly_independent_of_piece_sizes(
            cmd in prop::sample::select(&[0x01u8, 0x11, 0x12][..]),
            payload in prop::collection::vec(any::<u8>(), 0..200),
            cuts in prop::collection::vec(1usize..12, 1..32),
        ) {
            let reports: std::vec::Vec<[u8; REPORT_SIZE]> =
                ReportChunks::new(cmd, &payload).unwrap().collect();

            let mut whole = ReportAssembler::new();
            let mut expected = None;
            for report in &reports {
                if let Some(m) = whole.feed(report).unwrap() {
                    expected = Some(m);
                }
            }
            let expected = expected.unwrap();
            prop_assert_eq!(expected.cmd, cmd);
            prop_assert_eq!(&expected.payload[..], &payload[..]);

            let mut split = ReportAssembler::new();
            let mut got = None;
            let mut cut = cuts.iter().cycle();
            for report in &reports {
                let chunk_len = report[4] as usize;
                let used = &report[..HEADER_SIZE + chunk_len];

                // First piece: header plus 0..=chunk_len payload bytes
                let first = HEADER_SIZE + (*cut.next().unwrap() - 1).min(chunk_len);
                let mut pieces = std::vec![&used[..first]];
                let mut pos = first;
                while pos < used.len() {
                    let end = (pos + *cut.next().unwrap()).min(used.len());
                    pieces.push(&used[pos..end]);
                    pos = end;
                }

                for piece in pieces {
                    if let Some(m) = split.feed(piece).unwrap() {
                        prop_assert!(got.is_none());
                        got = Some(m);
                    }
                }
            }

            prop_assert_eq!(got, Some(expected));
        }
    }
}
