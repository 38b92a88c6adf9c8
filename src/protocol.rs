//! Wire format for the frame stream.
//!
//! Each record is
//!
//! ```text
//! u32 LE  width
//! u32 LE  height
//! [u8]    pixels   (width * height * element_size bytes)
//! ```
//!
//! There is no version byte and no stream tag. Records alternate colour,
//! depth, colour, depth, ... on a single connection, and the receiver infers
//! the element size (4 for colour, 2 for depth) from that position.

use crate::error::ReceiveError;
use crate::types::{FrameBuffer, StreamKind};
use std::io::{ErrorKind, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

// -- Endpoint --
pub const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::LOCALHOST;
pub const DEFAULT_PORT: u16 = 13269;

// -- Record geometry --
pub const HEADER_LEN: usize = 8;

/// Order in which records appear on the wire, repeating.
pub const RECORD_ORDER: [StreamKind; 2] = [StreamKind::Color, StreamKind::Depth];

pub fn default_endpoint() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(DEFAULT_ADDR, DEFAULT_PORT))
}

/// Total bytes of an encoded record.
pub fn record_len(width: u32, height: u32, element_size: u32) -> usize {
    HEADER_LEN + FrameBuffer::byte_len(width, height, element_size)
}

/// Serialize a frame into one wire record.
pub fn encode_frame(frame: &FrameBuffer) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + frame.pixels().len());
    buf.extend_from_slice(&frame.width().to_le_bytes());
    buf.extend_from_slice(&frame.height().to_le_bytes());
    buf.extend_from_slice(frame.pixels());
    buf
}

/// Parse `(width, height)` from the start of a record.
pub fn decode_header(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < HEADER_LEN {
        return None;
    }
    let width = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    Some((width, height))
}

/// Read one record of `kind` from `reader`.
///
/// `max_pixel_bytes` bounds the allocation a corrupt header could request.
pub fn read_record<R: Read>(
    reader: &mut R,
    kind: StreamKind,
    max_pixel_bytes: usize,
) -> Result<FrameBuffer, ReceiveError> {
    let mut header = [0u8; HEADER_LEN];
    read_exact_or_truncated(reader, &mut header, kind)?;
    let (width, height) = decode_header(&header).ok_or(ReceiveError::Truncated { kind })?;

    let element_size = kind.element_size();
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(element_size as usize))
        .unwrap_or(usize::MAX);
    if len > max_pixel_bytes {
        return Err(ReceiveError::Oversized {
            kind,
            width,
            height,
            limit: max_pixel_bytes,
        });
    }

    let mut pixels = vec![0u8; len];
    read_exact_or_truncated(reader, &mut pixels, kind)?;
    Ok(FrameBuffer::new(width, height, element_size, pixels))
}

fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    kind: StreamKind,
) -> Result<(), ReceiveError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => ReceiveError::Truncated { kind },
        _ => ReceiveError::Io(e),
    })
}
