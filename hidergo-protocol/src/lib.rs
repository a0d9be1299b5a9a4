//! hid:ergo Control Protocol
//!
//! This crate defines the HID report protocol between a host configuration
//! tool and the keyboard. Logical messages are split into fixed-size HID
//! reports and reassembled on the other side.
//!
//! # Protocol Overview
//!
//! Every report that starts a chunk carries a header:
//! ```text
//! ┌───────────┬─────┬──────┬────────────┬──────────────┬─────┬──────────┐
//! │ REPORT ID │ CMD │ SIZE │ CHUNK SIZE │ CHUNK OFFSET │ CRC │ DATA     │
//! │ 1B (0x05) │ 1B  │ 2B   │ 1B         │ 2B           │ 1B  │ 0–24B    │
//! └───────────┴─────┴──────┴────────────┴──────────────┴─────┴──────────┘
//! ```
//!
//! Multi-byte fields are little-endian. `SIZE` is the length of the whole
//! logical payload, `CHUNK SIZE` the number of payload bytes that follow
//! this header. The CRC byte is carried but not verified.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod assembler;
pub mod messages;
pub mod report;

pub use assembler::{Message, ReportAssembler};
pub use messages::{Command, GetConfigRequest, GetConfigResponse, SetConfig};
pub use report::{
    Header, ReportChunks, CHUNK_DATA_SIZE, HEADER_SIZE, MAX_MESSAGE_SIZE, REPORT_ID, REPORT_SIZE,
};

/// Errors raised while decoding or encoding control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// First report of a chunk does not carry report id 0x05
    BadReportId,
    /// Report or payload shorter than its fixed layout
    Truncated,
    /// Announced message size exceeds the reassembly buffer
    OutOfMemory,
    /// Command byte is not a known command
    UnsupportedCommand,
    /// Payload does not fit the output buffer
    PayloadTooLarge,
}
