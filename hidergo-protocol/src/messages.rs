//! Message types for the control protocol
//!
//! Payload layouts (little-endian):
//! - SET_CONFIG: `key:u16, size:u16, save:u8, data[size]`
//! - GET_CONFIG request: `key:u16, max_size:u16`
//! - GET_CONFIG response: `key:u16, size:u16, data[size]`
//! - CONNECT: empty in both directions

use heapless::Vec;

use crate::report::MAX_MESSAGE_SIZE;
use crate::ProtocolError;

// Command IDs
pub const CMD_INVALID: u8 = 0x00;
pub const CMD_CONNECT: u8 = 0x01;
pub const CMD_SET_CONFIG: u8 = 0x11;
pub const CMD_GET_CONFIG: u8 = 0x12;

/// Control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Reserved, never valid on the wire
    Invalid = CMD_INVALID,
    /// Link check
    Connect = CMD_CONNECT,
    /// Write a configuration field
    SetConfig = CMD_SET_CONFIG,
    /// Read a configuration field
    GetConfig = CMD_GET_CONFIG,
}

impl Command {
    /// Parse a command byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CMD_INVALID => Some(Command::Invalid),
            CMD_CONNECT => Some(Command::Connect),
            CMD_SET_CONFIG => Some(Command::SetConfig),
            CMD_GET_CONFIG => Some(Command::GetConfig),
            _ => None,
        }
    }

    /// Get the command byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// SET_CONFIG request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetConfig<'a> {
    pub key: u16,
    /// Announced field size, `data.len()` always equals it
    pub size: u16,
    /// Persist the value to flash
    pub save: bool,
    pub data: &'a [u8],
}

impl<'a> SetConfig<'a> {
    const FIXED_SIZE: usize = 5;

    /// Parse a SET_CONFIG payload
    pub fn decode(payload: &'a [u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::FIXED_SIZE {
            return Err(ProtocolError::Truncated);
        }
        let key = u16::from_le_bytes([payload[0], payload[1]]);
        let size = u16::from_le_bytes([payload[2], payload[3]]);
        let save = payload[4] != 0;

        let end = Self::FIXED_SIZE + size as usize;
        let data = payload
            .get(Self::FIXED_SIZE..end)
            .ok_or(ProtocolError::Truncated)?;

        Ok(Self {
            key,
            size,
            save,
            data,
        })
    }

    /// Encode into a payload (host side, tests)
    pub fn encode(&self) -> Result<Vec<u8, MAX_MESSAGE_SIZE>, ProtocolError> {
        let mut payload = Vec::new();
        payload
            .extend_from_slice(&self.key.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        payload
            .extend_from_slice(&self.size.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        payload
            .push(self.save as u8)
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        payload
            .extend_from_slice(self.data)
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        Ok(payload)
    }
}

/// GET_CONFIG request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetConfigRequest {
    pub key: u16,
    /// Largest field size the host accepts
    pub max_size: u16,
}

impl GetConfigRequest {
    /// Parse a GET_CONFIG payload
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < 4 {
            return Err(ProtocolError::Truncated);
        }
        Ok(Self {
            key: u16::from_le_bytes([payload[0], payload[1]]),
            max_size: u16::from_le_bytes([payload[2], payload[3]]),
        })
    }

    /// Encode into a payload (host side, tests)
    pub fn encode(&self) -> [u8; 4] {
        let key = self.key.to_le_bytes();
        let max = self.max_size.to_le_bytes();
        [key[0], key[1], max[0], max[1]]
    }
}

/// GET_CONFIG response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfigResponse<'a> {
    pub key: u16,
    pub data: &'a [u8],
}

impl GetConfigResponse<'_> {
    /// Encode into a payload
    pub fn encode(&self) -> Result<Vec<u8, MAX_MESSAGE_SIZE>, ProtocolError> {
        let size = u16::try_from(self.data.len()).map_err(|_| ProtocolError::PayloadTooLarge)?;
        let mut payload = Vec::new();
        payload
            .extend_from_slice(&self.key.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        payload
            .extend_from_slice(&size.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        payload
            .extend_from_slice(self.data)
            .map_err(|_| ProtocolError::PayloadTooLarge)?;
        Ok(payload)
    }

    /// Parse a response payload (host side, tests)
    pub fn decode(payload: &[u8]) -> Result<GetConfigResponse<'_>, ProtocolError> {
        if payload.len() < 4 {
            return Err(ProtocolError::Truncated);
        }
        let key = u16::from_le_bytes([payload[0], payload[1]]);
        let size = u16::from_le_bytes([payload[2], payload[3]]) as usize;
        let data = payload.get(4..4 + size).ok_or(ProtocolError::Truncated)?;
        Ok(GetConfigResponse { key, data })
    }
}
