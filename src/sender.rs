use crate::error::SendError;
use crate::protocol;
use crate::types::FrameBuffer;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Byte-stream connection the sender writes to.
///
/// `send` is a single write attempt; callers treat anything short of the full
/// buffer as a failure.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.write(bytes)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        TcpStream::shutdown(self, how)
    }
}

/// Owns the outbound connection and writes encoded frames to it.
pub struct StreamSender<T: Transport> {
    transport: T,
    frames_sent: u64,
    bytes_sent: u64,
}

impl StreamSender<TcpStream> {
    /// Connect to the frame consumer.
    pub fn connect(addr: SocketAddr) -> Result<Self, SendError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        log::info!("Connected to frame consumer at {}", addr);
        Ok(Self::new(stream))
    }
}

impl<T: Transport> StreamSender<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Write `bytes` in one call. A short or zero-length write is an error;
    /// nothing is retried or buffered.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let written = self.transport.send(bytes)?;
        if written == 0 && !bytes.is_empty() {
            return Err(SendError::Closed);
        }
        if written < bytes.len() {
            return Err(SendError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        self.bytes_sent += written as u64;
        Ok(())
    }

    /// Encode and send one frame. The frame is dropped either way.
    pub fn send_frame(&mut self, frame: FrameBuffer) -> Result<(), SendError> {
        let record = protocol::encode_frame(&frame);
        drop(frame);
        self.send(&record)?;
        self.frames_sent += 1;
        Ok(())
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Shut the connection down in both directions and close it.
    pub fn close(mut self) -> io::Result<T> {
        self.transport.shutdown(Shutdown::Both)?;
        Ok(self.transport)
    }
}
