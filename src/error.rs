use crate::types::StreamKind;
use std::fmt;

/// Raw failure code reported by the sensor device (an HRESULT on the
/// reference hardware).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError {
    pub code: i32,
}

// HRESULT values are conventionally written as unsigned hex.
const fn hresult(value: u32) -> i32 {
    value as i32
}

pub const E_FAIL: i32 = hresult(0x8000_4005);
pub const E_POINTER: i32 = hresult(0x8000_4003);
pub const E_INVALIDARG: i32 = hresult(0x8007_0057);
pub const E_OUTOFMEMORY: i32 = hresult(0x8007_000E);
pub const E_NUI_DEVICE_NOT_CONNECTED: i32 = hresult(0x8007_048F);
pub const E_NUI_DEVICE_NOT_READY: i32 = hresult(0x8007_0015);
pub const E_NUI_ALREADY_INITIALIZED: i32 = hresult(0x8007_04DF);
pub const E_NUI_NO_MORE_ITEMS: i32 = hresult(0x8007_0103);
pub const E_NUI_FRAME_NO_DATA: i32 = hresult(0x8301_0001);
pub const E_NUI_STREAM_NOT_ENABLED: i32 = hresult(0x8301_0002);
pub const E_NUI_IMAGE_STREAM_IN_USE: i32 = hresult(0x8301_0003);
pub const E_NUI_FRAME_LIMIT_EXCEEDED: i32 = hresult(0x8301_0004);
pub const E_NUI_FEATURE_NOT_INITIALIZED: i32 = hresult(0x8301_0005);

impl DeviceError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }

    /// Symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.code {
            E_FAIL => "E_FAIL",
            E_POINTER => "E_POINTER",
            E_INVALIDARG => "E_INVALIDARG",
            E_OUTOFMEMORY => "E_OUTOFMEMORY",
            E_NUI_DEVICE_NOT_CONNECTED => "E_NUI_DEVICE_NOT_CONNECTED",
            E_NUI_DEVICE_NOT_READY => "E_NUI_DEVICE_NOT_READY",
            E_NUI_ALREADY_INITIALIZED => "E_NUI_ALREADY_INITIALIZED",
            E_NUI_NO_MORE_ITEMS => "E_NUI_NO_MORE_ITEMS",
            E_NUI_FRAME_NO_DATA => "E_NUI_FRAME_NO_DATA",
            E_NUI_STREAM_NOT_ENABLED => "E_NUI_STREAM_NOT_ENABLED",
            E_NUI_IMAGE_STREAM_IN_USE => "E_NUI_IMAGE_STREAM_IN_USE",
            E_NUI_FRAME_LIMIT_EXCEEDED => "E_NUI_FRAME_LIMIT_EXCEEDED",
            E_NUI_FEATURE_NOT_INITIALIZED => "E_NUI_FEATURE_NOT_INITIALIZED",
            _ => return None,
        };
        Some(name)
    }

    /// True when the device gave up waiting for a frame.
    pub fn is_frame_timeout(&self) -> bool {
        self.code == E_NUI_FRAME_NO_DATA
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08x}", self.code as u32),
        }
    }
}

impl std::error::Error for DeviceError {}

/// A device stream could not be opened within the retry bound.
#[derive(Debug, thiserror::Error)]
#[error("Failed to open {kind} stream after {attempts} attempt(s): {source}")]
pub struct OpenError {
    pub kind: StreamKind,
    pub attempts: u32,
    /// The error from the final attempt.
    #[source]
    pub source: DeviceError,
}

impl OpenError {
    pub fn last_device_error(&self) -> DeviceError {
        self.source
    }
}

/// Failure to obtain one frame from an open stream.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("No frame from {0} stream")]
    NoFrame(StreamKind),

    #[error("Timed out waiting for {0} frame")]
    Timeout(StreamKind),

    #[error("Buffer length of received {kind} texture is bogus (pitch={pitch}, size={size})")]
    BogusBuffer {
        kind: StreamKind,
        pitch: u32,
        size: u32,
    },

    #[error("{kind} stream is not open")]
    NotOpen { kind: StreamKind },

    #[error("Failed to get next frame from {kind} stream: {source}")]
    Device {
        kind: StreamKind,
        #[source]
        source: DeviceError,
    },
}

/// Transport failure while writing an encoded frame.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("Connection closed by peer")]
    Closed,
}

/// Failure while decoding frame records on the consumer side.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("Receive failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed before a {kind} record was complete")]
    Truncated { kind: StreamKind },

    #[error("{kind} record claims {width}x{height}, larger than the {limit} byte limit")]
    Oversized {
        kind: StreamKind,
        width: u32,
        height: u32,
        limit: usize,
    },
}

/// Errors that stop the capture pipeline.
#[derive(Debug, thiserror::Error)]
pub enum KineticError {
    #[error("Failed to initialise sensor ({0})")]
    Init(DeviceError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    #[error("Transport shutdown failed: {0}")]
    Shutdown(std::io::Error),
}

impl KineticError {
    /// Short label of the pipeline stage that failed, for log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            KineticError::Init(_) => "init",
            KineticError::Open(_) => "open",
            KineticError::Read(_) => "read",
            KineticError::Send(_) => "send",
            KineticError::Receive(_) => "receive",
            KineticError::Shutdown(_) => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_names() {
        assert_eq!(
            DeviceError::new(E_NUI_DEVICE_NOT_CONNECTED).to_string(),
            "E_NUI_DEVICE_NOT_CONNECTED"
        );
        assert!(DeviceError::new(E_NUI_FRAME_NO_DATA).is_frame_timeout());
    }

    #[test]
    fn unknown_codes_print_hex() {
        assert_eq!(DeviceError::new(0x1234).to_string(), "0x00001234");
        assert_eq!(DeviceError::new(-1).to_string(), "0xffffffff");
    }

    #[test]
    fn open_error_reports_device_error() {
        let err = OpenError {
            kind: StreamKind::Depth,
            attempts: 3,
            source: DeviceError::new(E_NUI_DEVICE_NOT_READY),
        };
        let msg = err.to_string();
        assert!(msg.contains("depth"));
        assert!(msg.contains("E_NUI_DEVICE_NOT_READY"));
        assert!(!msg.contains("exhausted"));
    }
}
