use crate::error::DeviceError;
use crate::types::{InitFlags, Resolution, StreamKind};

/// Read-locked view of a device frame's pixel memory.
///
/// Borrowed from the device; only valid until the frame is unlocked.
#[derive(Debug)]
pub struct LockedRect<'a> {
    /// Bytes per row.
    pub pitch: u32,
    /// Total bytes in the locked region.
    pub size: u32,
    pub bits: &'a [u8],
}

/// Contract the capture core needs from the depth-camera SDK.
///
/// Discovery and SDK bootstrap live outside the crate; an implementation
/// wraps an already-reachable sensor. Calls are blocking.
pub trait SensorDevice {
    /// Opaque stream handle issued by [`open_stream`](Self::open_stream).
    type Stream: Copy + std::fmt::Debug;
    /// Device-owned frame, valid until [`release_frame`](Self::release_frame).
    type Frame;

    fn initialize(&mut self, flags: InitFlags) -> Result<(), DeviceError>;

    fn open_stream(
        &mut self,
        kind: StreamKind,
        resolution: Resolution,
    ) -> Result<Self::Stream, DeviceError>;

    /// Block up to `timeout_ms` for the next frame. `Ok(None)` means the call
    /// returned without producing a frame.
    fn next_frame(
        &mut self,
        stream: Self::Stream,
        timeout_ms: u32,
    ) -> Result<Option<Self::Frame>, DeviceError>;

    fn lock<'a>(&'a mut self, frame: &'a Self::Frame) -> LockedRect<'a>;

    fn unlock(&mut self, frame: &Self::Frame);

    fn release_frame(&mut self, stream: Self::Stream, frame: Self::Frame);

    /// Give back a stream handle. Devices that tear streams down in
    /// [`shutdown`](Self::shutdown) can keep the default.
    fn close_stream(&mut self, _stream: Self::Stream) {}

    fn shutdown(&mut self);
}
