//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4)  │ CRC (4)  │         Payload             │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Length and CRC are big endian. The CRC32 covers the payload only.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KvError, Result};
use super::{Reply, ReplyKind, Request, RequestKind};

/// Header size: 1 byte tag + 4 bytes length + 4 bytes CRC
pub const HEADER_SIZE: usize = 9;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame helpers
// =============================================================================

fn encode_frame(tag: u8, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u8(tag);
    frame.put_u32(payload.len() as u32);
    frame.put_u32(crc32fast::hash(payload));
    frame.put_slice(payload);
    Ok(frame.freeze())
}

fn parse_header(header: &[u8]) -> Result<(u8, usize, u32)> {
    let tag = header[0];
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    let crc = u32::from_be_bytes([header[5], header[6], header[7], header[8]]);

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    Ok((tag, payload_len as usize, crc))
}

fn check_crc(payload: &[u8], expected: u32) -> Result<()> {
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(KvError::Protocol(format!(
            "Checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
            expected, actual
        )));
    }
    Ok(())
}

/// Split a complete frame into tag and verified payload
fn decode_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let (tag, payload_len, crc) = parse_header(&bytes[..HEADER_SIZE])?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_SIZE..total_len];
    check_crc(payload, crc)?;
    Ok((tag, payload))
}

/// Read one frame from a stream
///
/// Blocks until the whole frame has arrived or an error occurs
fn read_frame<R: Read>(reader: &mut R) -> Result<(u8, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let (tag, payload_len, crc) = parse_header(&header)?;

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }
    check_crc(&payload, crc)?;

    Ok((tag, payload))
}

fn to_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn from_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(payload)?)
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to a frame
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let payload = match request {
        Request::Get(body) => to_payload(body)?,
        Request::Set(body) => to_payload(body)?,
        Request::List(body) => to_payload(body)?,
        Request::Remove(body) => to_payload(body)?,
    };
    encode_frame(request.kind() as u8, &payload)
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (tag, payload) = decode_frame(bytes)?;
    request_from_parts(tag, payload)
}

fn request_from_parts(tag: u8, payload: &[u8]) -> Result<Request> {
    let kind = RequestKind::from_tag(tag).ok_or_else(|| {
        KvError::Protocol(format!("Unknown request type: 0x{:02x}", tag))
    })?;

    let request = match kind {
        RequestKind::Get => Request::Get(from_payload(payload)?),
        RequestKind::Set => Request::Set(from_payload(payload)?),
        RequestKind::List => Request::List(from_payload(payload)?),
        RequestKind::Remove => Request::Remove(from_payload(payload)?),
    };
    Ok(request)
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to a frame
pub fn encode_reply(reply: &Reply) -> Result<Bytes> {
    let payload = match reply {
        Reply::Unary(response) => to_payload(response)?,
        Reply::Item(pair) => to_payload(pair)?,
        Reply::End => Vec::new(),
        Reply::Status(status) => to_payload(status)?,
    };
    encode_frame(reply.kind() as u8, &payload)
}

/// Decode a reply from a complete frame
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let (tag, payload) = decode_frame(bytes)?;
    reply_from_parts(tag, payload)
}

fn reply_from_parts(tag: u8, payload: &[u8]) -> Result<Reply> {
    let reply = match tag {
        t if t == ReplyKind::Unary as u8 => Reply::Unary(from_payload(payload)?),
        t if t == ReplyKind::Item as u8 => Reply::Item(from_payload(payload)?),
        t if t == ReplyKind::End as u8 => {
            if !payload.is_empty() {
                return Err(KvError::Protocol(format!(
                    "END reply: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Reply::End
        }
        t if t == ReplyKind::Status as u8 => Reply::Status(from_payload(payload)?),
        _ => {
            return Err(KvError::Protocol(format!(
                "Unknown reply type: 0x{:02x}",
                tag
            )))
        }
    };
    Ok(reply)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let (tag, payload) = read_frame(reader)?;
    request_from_parts(tag, &payload)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<Reply> {
    let (tag, payload) = read_frame(reader)?;
    reply_from_parts(tag, &payload)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let bytes = encode_reply(reply)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
