use crate::error::{DeviceError, OpenError};
use crate::sensor::SensorDevice;
use crate::types::{Resolution, StreamKind, StreamState};
use std::time::Duration;

/// Bounded retry used while a device stream warms up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRetry {
    /// Total open attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Sleep between attempts. `None` only yields the thread.
    pub delay: Option<Duration>,
}

impl OpenRetry {
    pub const DEFAULT_ATTEMPTS: u32 = 10_000;

    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: None,
        }
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn pause(&self) {
        match self.delay {
            Some(delay) if !delay.is_zero() => std::thread::sleep(delay),
            _ => std::thread::yield_now(),
        }
    }
}

impl Default for OpenRetry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS)
    }
}

/// One device image stream (colour or depth) and its open state.
#[derive(Debug)]
pub struct StreamHandle<S> {
    kind: StreamKind,
    resolution: Resolution,
    state: StreamState,
    raw: Option<S>,
}

impl<S: Copy + std::fmt::Debug> StreamHandle<S> {
    pub fn new(kind: StreamKind, resolution: Resolution) -> Self {
        Self {
            kind,
            resolution,
            state: StreamState::Closed,
            raw: None,
        }
    }

    /// Open a stream of `kind`, retrying immediately on failure.
    ///
    /// On exhaustion the error carries the device error from the final
    /// attempt.
    pub fn open<D>(
        device: &mut D,
        kind: StreamKind,
        resolution: Resolution,
        retry: &OpenRetry,
    ) -> Result<Self, OpenError>
    where
        D: SensorDevice<Stream = S>,
    {
        let mut handle = Self::new(kind, resolution);
        handle.state = StreamState::Opening;

        let max_attempts = retry.max_attempts.max(1);
        let mut last_err: Option<DeviceError> = None;
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let result = device.open_stream(kind, resolution);
            retry.pause();
            match result {
                Ok(raw) => {
                    if attempts > 1 {
                        log::info!("Opened {} stream {} (attempt {})", kind, resolution, attempts);
                    } else {
                        log::info!("Opened {} stream {}", kind, resolution);
                    }
                    handle.raw = Some(raw);
                    handle.state = StreamState::Open;
                    return Ok(handle);
                }
                Err(e) => {
                    if attempts <= 3 || attempts % 1000 == 0 {
                        log::debug!(
                            "{} stream open failed: {} (attempt {}/{})",
                            kind,
                            e,
                            attempts,
                            max_attempts
                        );
                    }
                    last_err = Some(e);
                }
            }
        }

        handle.state = StreamState::Failed;
        // The loop always runs at least once, so an error is recorded here.
        let source = last_err.unwrap_or(DeviceError::new(crate::error::E_FAIL));
        Err(OpenError {
            kind,
            attempts,
            source,
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == StreamState::Open
    }

    /// Device handle, if open.
    pub fn raw(&self) -> Option<S> {
        self.raw.filter(|_| self.is_open())
    }

    /// Hand the stream back to the device. Closing twice is a no-op.
    pub fn close<D>(&mut self, device: &mut D)
    where
        D: SensorDevice<Stream = S>,
    {
        if let Some(raw) = self.raw.take() {
            device.close_stream(raw);
            log::debug!("Closed {} stream", self.kind);
        }
        self.state = StreamState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{E_NUI_DEVICE_NOT_READY, E_NUI_IMAGE_STREAM_IN_USE};
    use crate::sensor::LockedRect;
    use crate::types::InitFlags;

    /// Fails the first `failures` opens, cycling through `codes`.
    struct FlakyDevice {
        failures: u32,
        codes: Vec<i32>,
        opens: u32,
        closed: Vec<u32>,
    }

    impl FlakyDevice {
        fn new(failures: u32, codes: Vec<i32>) -> Self {
            Self {
                failures,
                codes,
                opens: 0,
                closed: Vec::new(),
            }
        }
    }

    impl SensorDevice for FlakyDevice {
        type Stream = u32;
        type Frame = ();

        fn initialize(&mut self, _flags: InitFlags) -> Result<(), DeviceError> {
            Ok(())
        }

        fn open_stream(&mut self, _: StreamKind, _: Resolution) -> Result<u32, DeviceError> {
            let n = self.opens;
            self.opens += 1;
            if n < self.failures {
                Err(DeviceError::new(self.codes[n as usize % self.codes.len()]))
            } else {
                Ok(n)
            }
        }

        fn next_frame(&mut self, _: u32, _: u32) -> Result<Option<()>, DeviceError> {
            Ok(None)
        }

        fn lock<'a>(&'a mut self, _: &'a ()) -> LockedRect<'a> {
            LockedRect {
                pitch: 0,
                size: 0,
                bits: &[],
            }
        }

        fn unlock(&mut self, _: &()) {}

        fn release_frame(&mut self, _: u32, _: ()) {}

        fn close_stream(&mut self, stream: u32) {
            self.closed.push(stream);
        }

        fn shutdown(&mut self) {}
    }

    #[test]
    fn opens_after_transient_failures() {
        let mut device = FlakyDevice::new(5, vec![E_NUI_DEVICE_NOT_READY]);
        let handle: StreamHandle<u32> = StreamHandle::open(
            &mut device,
            StreamKind::Depth,
            Resolution::new(640, 480),
            &OpenRetry::new(10),
        )
        .unwrap();
        assert!(handle.is_open());
        assert_eq!(handle.raw(), Some(5));
        assert_eq!(device.opens, 6);
    }

    #[test]
    fn exhaustion_reports_last_device_error() {
        let mut device = FlakyDevice::new(
            u32::MAX,
            vec![E_NUI_DEVICE_NOT_READY, E_NUI_IMAGE_STREAM_IN_USE],
        );
        let err = StreamHandle::<u32>::open(
            &mut device,
            StreamKind::Color,
            Resolution::new(1280, 960),
            &OpenRetry::new(4),
        )
        .unwrap_err();
        assert_eq!(device.opens, 4);
        assert_eq!(err.attempts, 4);
        assert_eq!(err.kind, StreamKind::Color);
        // Attempt 4 used codes[3 % 2] = IN_USE.
        assert_eq!(err.last_device_error().code, E_NUI_IMAGE_STREAM_IN_USE);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut device = FlakyDevice::new(u32::MAX, vec![E_NUI_DEVICE_NOT_READY]);
        let err = StreamHandle::<u32>::open(
            &mut device,
            StreamKind::Depth,
            Resolution::new(640, 480),
            &OpenRetry::new(0),
        )
        .unwrap_err();
        assert_eq!(device.opens, 1);
        assert_eq!(err.last_device_error().code, E_NUI_DEVICE_NOT_READY);
    }

    #[test]
    fn close_is_idempotent() {
        let mut device = FlakyDevice::new(0, vec![E_NUI_DEVICE_NOT_READY]);
        let mut handle = StreamHandle::open(
            &mut device,
            StreamKind::Depth,
            Resolution::new(640, 480),
            &OpenRetry::default(),
        )
        .unwrap();
        handle.close(&mut device);
        handle.close(&mut device);
        assert_eq!(device.closed, vec![0]);
        assert_eq!(handle.state(), StreamState::Closed);
        assert_eq!(handle.raw(), None);
    }
}
