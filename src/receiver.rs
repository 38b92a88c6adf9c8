use crate::error::ReceiveError;
use crate::protocol;
use crate::types::{FrameBuffer, StreamKind};
use std::io::{ErrorKind, Read};

/// Largest pixel payload accepted per record (a 1280x960 RGBA frame).
pub const DEFAULT_MAX_PIXEL_BYTES: usize = 1280 * 960 * 4;

/// One colour record and the depth record that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePair {
    pub color: FrameBuffer,
    pub depth: FrameBuffer,
}

/// Consumer side of the frame stream.
///
/// Relies on the fixed colour-then-depth order to know each record's
/// element size.
pub struct FrameReceiver<R: Read> {
    reader: R,
    max_pixel_bytes: usize,
    pairs_received: u64,
}

impl<R: Read> FrameReceiver<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_pixel_bytes: DEFAULT_MAX_PIXEL_BYTES,
            pairs_received: 0,
        }
    }

    pub fn with_max_pixel_bytes(mut self, max: usize) -> Self {
        self.max_pixel_bytes = max;
        self
    }

    /// Read the next colour/depth pair.
    pub fn next_pair(&mut self) -> Result<FramePair, ReceiveError> {
        let color = protocol::read_record(&mut self.reader, StreamKind::Color, self.max_pixel_bytes)?;
        let depth = protocol::read_record(&mut self.reader, StreamKind::Depth, self.max_pixel_bytes)?;
        self.pairs_received += 1;
        Ok(FramePair { color, depth })
    }

    pub fn pairs_received(&self) -> u64 {
        self.pairs_received
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for FrameReceiver<R> {
    type Item = Result<FramePair, ReceiveError>;

    /// Yields pairs until the peer closes the connection between pairs.
    fn next(&mut self) -> Option<Self::Item> {
        let mut first = [0u8; 1];
        loop {
            match self.reader.read(&mut first) {
                Ok(0) => return None,
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(ReceiveError::Io(e))),
            }
        }

        let max = self.max_pixel_bytes;
        let color = {
            let mut chained = (&first[..]).chain(&mut self.reader);
            protocol::read_record(&mut chained, StreamKind::Color, max)
        };
        let pair = color.and_then(|color| {
            let depth = protocol::read_record(&mut self.reader, StreamKind::Depth, max)?;
            Ok(FramePair { color, depth })
        });
        if pair.is_ok() {
            self.pairs_received += 1;
        }
        Some(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;

    fn wire(pairs: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..pairs {
            out.extend(encode_frame(&FrameBuffer::new(4, 3, 4, vec![i as u8; 48])));
            out.extend(encode_frame(&FrameBuffer::new(4, 3, 2, vec![!(i as u8); 24])));
        }
        out
    }

    #[test]
    fn reads_pairs_in_order() {
        let bytes = wire(2);
        let mut rx = FrameReceiver::new(bytes.as_slice());
        let first = rx.next_pair().unwrap();
        assert_eq!(first.color.pixels().len(), 48);
        assert_eq!(first.depth.pixels().len(), 24);
        assert_eq!(first.depth.pixels()[0], 0xFF);
        let second = rx.next_pair().unwrap();
        assert_eq!(second.color.pixels()[0], 1);
        assert_eq!(rx.pairs_received(), 2);
    }

    #[test]
    fn iterator_stops_at_clean_end() {
        let pairs: Vec<_> = FrameReceiver::new(wire(3).as_slice()).collect();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.is_ok()));
    }

    #[test]
    fn iterator_reports_partial_header() {
        let mut bytes = wire(1);
        bytes.extend_from_slice(&[4, 0, 0]);
        let mut rx = FrameReceiver::new(bytes.as_slice());
        assert!(rx.next().unwrap().is_ok());
        assert!(matches!(
            rx.next(),
            Some(Err(ReceiveError::Truncated { kind: StreamKind::Color }))
        ));
    }

    #[test]
    fn missing_depth_record_is_an_error() {
        let mut bytes = wire(1);
        bytes.truncate(8 + 48);
        let mut rx = FrameReceiver::new(bytes.as_slice());
        assert!(matches!(
            rx.next_pair(),
            Err(ReceiveError::Truncated { kind: StreamKind::Depth })
        ));
    }
}
