//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use kineticscan::error::E_NUI_DEVICE_NOT_READY;
use kineticscan::{
    DeviceClass, DeviceError, InitFlags, LockedRect, Resolution, SensorDevice, StreamKind,
    TrackedDevicePose, TrackedDeviceProperty, TrackingEvent, TrackingEventKind, TrackingRuntime,
    Transport,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::Shutdown;
use std::rc::Rc;

/// Every collaborator call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize(InitFlags),
    Open(StreamKind),
    NextFrame(StreamKind),
    Release(StreamKind),
    CloseStream(StreamKind),
    SensorShutdown,
    RuntimeShutdown,
    Send(usize),
    TransportShutdown(Shutdown),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(journal: &Journal, call: &Call) -> usize {
    journal.borrow().iter().filter(|c| *c == call).count()
}

pub struct StubFrame {
    pub pitch: u32,
    pub size: u32,
    pub bits: Vec<u8>,
}

impl StubFrame {
    /// Tightly packed frame filled with `value`.
    pub fn solid(kind: StreamKind, width: u32, height: u32, value: u8) -> Self {
        let pitch = width * kind.element_size();
        Self {
            pitch,
            size: pitch * height,
            bits: vec![value; (pitch * height) as usize],
        }
    }

    pub fn zero_pitch() -> Self {
        Self {
            pitch: 0,
            size: 0,
            bits: Vec::new(),
        }
    }
}

enum FrameSource {
    Scripted(VecDeque<Result<Option<StubFrame>, DeviceError>>),
    Endless { width: u32, height: u32 },
}

pub struct StubSensor {
    journal: Journal,
    frames: HashMap<StreamKind, FrameSource>,
    /// Opens of this kind that fail before one succeeds.
    open_failures: HashMap<StreamKind, u32>,
    pub open_attempts: HashMap<StreamKind, u32>,
}

impl StubSensor {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            frames: HashMap::new(),
            open_failures: HashMap::new(),
            open_attempts: HashMap::new(),
        }
    }

    pub fn with_frames(mut self, kind: StreamKind, frames: Vec<StubFrame>) -> Self {
        self.frames.insert(
            kind,
            FrameSource::Scripted(frames.into_iter().map(|f| Ok(Some(f))).collect()),
        );
        self
    }

    pub fn with_frame_results(
        mut self,
        kind: StreamKind,
        results: Vec<Result<Option<StubFrame>, DeviceError>>,
    ) -> Self {
        self.frames
            .insert(kind, FrameSource::Scripted(results.into_iter().collect()));
        self
    }

    pub fn endless(mut self, width: u32, height: u32) -> Self {
        for kind in [StreamKind::Color, StreamKind::Depth] {
            self.frames.insert(kind, FrameSource::Endless { width, height });
        }
        self
    }

    pub fn failing_open(mut self, kind: StreamKind, failures: u32) -> Self {
        self.open_failures.insert(kind, failures);
        self
    }

    fn log(&self, call: Call) {
        self.journal.borrow_mut().push(call);
    }
}

impl SensorDevice for StubSensor {
    type Stream = StreamKind;
    type Frame = StubFrame;

    fn initialize(&mut self, flags: InitFlags) -> Result<(), DeviceError> {
        self.log(Call::Initialize(flags));
        Ok(())
    }

    fn open_stream(&mut self, kind: StreamKind, _: Resolution) -> Result<StreamKind, DeviceError> {
        self.log(Call::Open(kind));
        let attempts = self.open_attempts.entry(kind).or_insert(0);
        *attempts += 1;
        let failures = self.open_failures.get(&kind).copied().unwrap_or(0);
        if *attempts <= failures {
            Err(DeviceError::new(E_NUI_DEVICE_NOT_READY))
        } else {
            Ok(kind)
        }
    }

    fn next_frame(&mut self, kind: StreamKind, _: u32) -> Result<Option<StubFrame>, DeviceError> {
        self.log(Call::NextFrame(kind));
        match self.frames.get_mut(&kind) {
            Some(FrameSource::Scripted(queue)) => queue.pop_front().unwrap_or(Ok(None)),
            Some(FrameSource::Endless { width, height }) => {
                Ok(Some(StubFrame::solid(kind, *width, *height, 0x5A)))
            }
            None => Ok(None),
        }
    }

    fn lock<'a>(&'a mut self, frame: &'a StubFrame) -> LockedRect<'a> {
        LockedRect {
            pitch: frame.pitch,
            size: frame.size,
            bits: &frame.bits,
        }
    }

    fn unlock(&mut self, _: &StubFrame) {}

    fn release_frame(&mut self, kind: StreamKind, _: StubFrame) {
        self.log(Call::Release(kind));
    }

    fn close_stream(&mut self, kind: StreamKind) {
        self.log(Call::CloseStream(kind));
    }

    fn shutdown(&mut self) {
        self.log(Call::SensorShutdown);
    }
}

/// Runtime with one HMD at 1.7 m and a queue of attach events.
pub struct StubRuntime {
    journal: Journal,
    events: VecDeque<TrackingEvent>,
    pub pose_waits: u32,
}

impl StubRuntime {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            events: VecDeque::from(vec![TrackingEvent {
                kind: TrackingEventKind::DeviceActivated,
                device_index: 0,
            }]),
            pose_waits: 0,
        }
    }
}

impl TrackingRuntime for StubRuntime {
    fn poll_next_event(&mut self) -> Option<TrackingEvent> {
        self.events.pop_front()
    }

    fn wait_get_poses(&mut self, poses: &mut [TrackedDevicePose]) {
        self.pose_waits += 1;
        poses[0] = TrackedDevicePose {
            device_to_absolute: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 1.7],
                [0.0, 0.0, 1.0, 0.0],
            ],
            pose_is_valid: true,
            device_is_connected: true,
        };
    }

    fn tracked_device_class(&mut self, index: u32) -> DeviceClass {
        if index == 0 {
            DeviceClass::Hmd
        } else {
            DeviceClass::Invalid
        }
    }

    fn string_property(&mut self, _: u32, _: TrackedDeviceProperty) -> Option<String> {
        Some("stub".into())
    }

    fn shutdown(&mut self) {
        self.journal.borrow_mut().push(Call::RuntimeShutdown);
    }
}

/// In-memory transport; optionally short-writes on the n-th send (1-based).
pub struct RecordingTransport {
    journal: Journal,
    pub written: Rc<RefCell<Vec<u8>>>,
    short_write_on: Option<usize>,
    sends: usize,
}

impl RecordingTransport {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            written: Rc::new(RefCell::new(Vec::new())),
            short_write_on: None,
            sends: 0,
        }
    }

    pub fn short_write_on(mut self, n: usize) -> Self {
        self.short_write_on = Some(n);
        self
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.sends += 1;
        let n = if self.short_write_on == Some(self.sends) {
            bytes.len() / 2
        } else {
            bytes.len()
        };
        self.written.borrow_mut().extend_from_slice(&bytes[..n]);
        self.journal.borrow_mut().push(Call::Send(n));
        Ok(n)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        self.journal.borrow_mut().push(Call::TransportShutdown(how));
        Ok(())
    }
}

/// Split a wire capture into `(width, height, pixel_len)` records,
/// alternating colour and depth element sizes.
pub fn split_records(mut bytes: &[u8]) -> Vec<(u32, u32, usize)> {
    let mut out = Vec::new();
    let mut kinds = [StreamKind::Color, StreamKind::Depth].into_iter().cycle();
    while bytes.len() >= 8 {
        let kind = kinds.next().unwrap();
        let (w, h) = kineticscan::protocol::decode_header(bytes).unwrap();
        let len = (w * h * kind.element_size()) as usize;
        out.push((w, h, len));
        bytes = &bytes[(8 + len).min(bytes.len())..];
    }
    out
}
