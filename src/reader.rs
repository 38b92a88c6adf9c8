use crate::error::ReadError;
use crate::sensor::{LockedRect, SensorDevice};
use crate::stream::StreamHandle;
use crate::types::{FrameBuffer, StreamKind};

/// Frame wait used by the capture loop.
pub const DEFAULT_FRAME_TIMEOUT_MS: u32 = 1000;

/// What to do with a locked buffer that reports a zero row pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroPitchPolicy {
    /// Fail the read with [`ReadError::BogusBuffer`].
    #[default]
    Abort,
    /// Produce a 0x0 frame and let the caller send it.
    EmptyFrame,
}

/// Pulls single frames off an open [`StreamHandle`] into owned buffers.
#[derive(Debug, Clone, Copy)]
pub struct FrameReader {
    pub timeout_ms: u32,
    pub zero_pitch: ZeroPitchPolicy,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            zero_pitch: ZeroPitchPolicy::Abort,
        }
    }
}

impl FrameReader {
    pub fn new(timeout_ms: u32, zero_pitch: ZeroPitchPolicy) -> Self {
        Self {
            timeout_ms,
            zero_pitch,
        }
    }

    /// Wait for the next frame, copy its pixels out, and release it.
    ///
    /// The device frame is unlocked and released before returning on every
    /// path once it has been obtained; nothing borrowed from it escapes.
    pub fn read<D>(
        &self,
        device: &mut D,
        handle: &StreamHandle<D::Stream>,
    ) -> Result<FrameBuffer, ReadError>
    where
        D: SensorDevice,
    {
        let kind = handle.kind();
        let stream = handle.raw().ok_or(ReadError::NotOpen { kind })?;

        let frame = match device.next_frame(stream, self.timeout_ms) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(ReadError::NoFrame(kind)),
            Err(e) if e.is_frame_timeout() => return Err(ReadError::Timeout(kind)),
            Err(e) => return Err(ReadError::Device { kind, source: e }),
        };

        let copied = {
            let rect = device.lock(&frame);
            copy_locked(kind, &rect, self.zero_pitch)
        };
        device.unlock(&frame);
        device.release_frame(stream, frame);

        let buffer = copied?;
        log::trace!(
            "Read {} frame {}x{}",
            kind,
            buffer.width(),
            buffer.height()
        );
        Ok(buffer)
    }
}

/// Derive geometry from the locked rect and copy the pixel extent.
fn copy_locked(
    kind: StreamKind,
    rect: &LockedRect<'_>,
    zero_pitch: ZeroPitchPolicy,
) -> Result<FrameBuffer, ReadError> {
    let element_size = kind.element_size();
    let bogus = || ReadError::BogusBuffer {
        kind,
        pitch: rect.pitch,
        size: rect.size,
    };

    if rect.pitch == 0 {
        return match zero_pitch {
            ZeroPitchPolicy::Abort => Err(bogus()),
            ZeroPitchPolicy::EmptyFrame => {
                log::warn!("{} buffer has zero pitch, sending empty frame", kind);
                Ok(FrameBuffer::empty(element_size))
            }
        };
    }

    let width = rect.pitch / element_size;
    let height = rect.size / rect.pitch;
    let pitch = rect.pitch as usize;
    if pitch * height as usize > rect.bits.len() {
        return Err(bogus());
    }

    let row_len = width as usize * element_size as usize;
    let mut pixels = Vec::with_capacity(FrameBuffer::byte_len(width, height, element_size));
    if row_len == pitch {
        pixels.extend_from_slice(&rect.bits[..pitch * height as usize]);
    } else {
        // Row padding stays behind in the device buffer.
        for row in rect.bits.chunks_exact(pitch).take(height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }
    }

    Ok(FrameBuffer::new(width, height, element_size, pixels))
}
