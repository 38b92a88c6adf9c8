use crate::transform::Mat4;
use std::fmt;

/// Which image stream a frame or handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// 32-bit RGBA colour.
    Color,
    /// 16-bit depth.
    Depth,
}

impl StreamKind {
    /// Bytes per pixel. Implied on the wire, never encoded.
    pub const fn element_size(self) -> u32 {
        match self {
            StreamKind::Color => 4,
            StreamKind::Depth => 2,
        }
    }

    /// Resolution the pipeline requests by default.
    pub const fn default_resolution(self) -> Resolution {
        match self {
            StreamKind::Color => Resolution::new(1280, 960),
            StreamKind::Depth => Resolution::new(640, 480),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Color => "color",
            StreamKind::Depth => "depth",
        })
    }
}

/// Requested stream resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Lifecycle of a [`StreamHandle`](crate::stream::StreamHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Closed,
    Opening,
    Open,
    Failed,
}

bitflags::bitflags! {
    /// Subsystems requested when the sensor is initialised.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InitFlags: u32 {
        const USES_DEPTH_AND_PLAYER_INDEX = 1 << 0;
        const USES_COLOR                  = 1 << 1;
        const USES_SKELETON               = 1 << 3;
        const USES_DEPTH                  = 1 << 5;
        const USES_AUDIO                  = 1 << 28;
    }
}

/// An owned copy of one captured image.
///
/// `pixels.len()` always equals `width * height * element_size`.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    element_size: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Wrap decoded pixel bytes.
    ///
    /// # Panics
    /// If `pixels.len()` disagrees with the dimensions. Callers compute the
    /// length from the same dimensions, so a mismatch is a bug.
    pub fn new(width: u32, height: u32, element_size: u32, pixels: Vec<u8>) -> Self {
        let expected = Self::byte_len(width, height, element_size);
        assert_eq!(
            pixels.len(),
            expected,
            "frame {}x{}x{} needs {} bytes",
            width,
            height,
            element_size,
            expected
        );
        Self {
            width,
            height,
            element_size,
            pixels,
        }
    }

    /// A 0x0 frame, sent in place of a zero-pitch buffer.
    pub fn empty(element_size: u32) -> Self {
        Self::new(0, 0, element_size, Vec::new())
    }

    /// Byte length of a frame with the given geometry.
    pub fn byte_len(width: u32, height: u32, element_size: u32) -> usize {
        width as usize * height as usize * element_size as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("element_size", &self.element_size)
            .field("len", &self.pixels.len())
            .finish()
    }
}

/// Upper bound on tracked device slots (OpenVR `k_unMaxTrackedDeviceCount`).
pub const MAX_TRACKED_DEVICES: usize = 64;

/// Tracked device category as reported by the tracking runtime.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Invalid = 0,
    Hmd = 1,
    Controller = 2,
    GenericTracker = 3,
    TrackingReference = 4,
}

impl DeviceClass {
    /// Human readable label, or `None` for [`DeviceClass::Invalid`].
    pub fn label(self) -> Option<&'static str> {
        match self {
            DeviceClass::Invalid => None,
            DeviceClass::Hmd => Some("HMD"),
            DeviceClass::Controller => Some("Controller"),
            DeviceClass::GenericTracker => Some("Generic Tracker"),
            DeviceClass::TrackingReference => Some("Tracking Reference"),
        }
    }
}

/// String properties queried from the tracking runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedDeviceProperty {
    TrackingSystemName,
    ModelNumber,
    SerialNumber,
}

/// One slot of the runtime's pose array, as returned by `wait_get_poses`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedDevicePose {
    /// Row-major 3x4 device-to-absolute-tracking matrix.
    pub device_to_absolute: [[f32; 4]; 3],
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl Default for TrackedDevicePose {
    fn default() -> Self {
        Self {
            device_to_absolute: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            pose_is_valid: false,
            device_is_connected: false,
        }
    }
}

/// Device lifecycle notifications from the tracking runtime's event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEventKind {
    DeviceActivated,
    DeviceDeactivated,
    DeviceUpdated,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEvent {
    pub kind: TrackingEventKind,
    pub device_index: u32,
}

/// Latest Z-up pose and classification for one tracked slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSample {
    pub device_index: u32,
    /// Last valid transform. Retained (not zeroed) while the pose is invalid.
    pub transform: Mat4,
    /// Set once, on the first valid observation of this slot.
    pub device_class: DeviceClass,
    pub serial_number: Option<String>,
    /// Refresh counter at which `transform` was last updated.
    pub last_valid_refresh: Option<u64>,
    /// True when the most recent refresh reported this pose as valid.
    pub fresh: bool,
}

impl PoseSample {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            transform: crate::transform::IDENTITY,
            device_class: DeviceClass::Invalid,
            serial_number: None,
            last_valid_refresh: None,
            fresh: false,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.device_class != DeviceClass::Invalid
    }

    /// True when `transform` did not come from the latest refresh.
    pub fn is_stale(&self) -> bool {
        !self.fresh
    }
}
