//! Stream a synthetic test pattern to a frame consumer on 127.0.0.1:13269.
//!
//! Usage: cargo run --example sender
//! Start the receiver example first. Set KINETIC_MAX_ITERATIONS to stop
//! after a fixed number of frame pairs.

use kineticscan::{
    protocol, DeviceClass, DeviceError, InitFlags, LockedRect, Pipeline, PipelineConfig,
    Resolution, SensorDevice, StreamKind, TrackedDevicePose, TrackedDeviceProperty, TrackingEvent,
    TrackingRuntime,
};

/// Gradient frames that scroll by one pixel per read.
struct TestPattern {
    color: Resolution,
    depth: Resolution,
    tick: u8,
}

struct PatternFrame {
    pitch: u32,
    bits: Vec<u8>,
}

impl SensorDevice for TestPattern {
    type Stream = StreamKind;
    type Frame = PatternFrame;

    fn initialize(&mut self, flags: InitFlags) -> Result<(), DeviceError> {
        println!("Sensor initialised with {:?}", flags);
        Ok(())
    }

    fn open_stream(&mut self, kind: StreamKind, resolution: Resolution) -> Result<StreamKind, DeviceError> {
        match kind {
            StreamKind::Color => self.color = resolution,
            StreamKind::Depth => self.depth = resolution,
        }
        Ok(kind)
    }

    fn next_frame(&mut self, kind: StreamKind, _timeout_ms: u32) -> Result<Option<PatternFrame>, DeviceError> {
        let res = match kind {
            StreamKind::Color => self.color,
            StreamKind::Depth => self.depth,
        };
        let pitch = res.width * kind.element_size();
        self.tick = self.tick.wrapping_add(1);
        let tick = self.tick;
        let bits = (0..pitch * res.height)
            .map(|i| ((i / kind.element_size()) as u8).wrapping_add(tick))
            .collect();
        Ok(Some(PatternFrame { pitch, bits }))
    }

    fn lock<'a>(&'a mut self, frame: &'a PatternFrame) -> LockedRect<'a> {
        LockedRect {
            pitch: frame.pitch,
            size: frame.bits.len() as u32,
            bits: &frame.bits,
        }
    }

    fn unlock(&mut self, _frame: &PatternFrame) {}

    fn release_frame(&mut self, _stream: StreamKind, _frame: PatternFrame) {}

    fn shutdown(&mut self) {
        println!("Sensor shut down");
    }
}

/// A single headset standing still at eye height.
struct StaticHeadset;

impl TrackingRuntime for StaticHeadset {
    fn poll_next_event(&mut self) -> Option<TrackingEvent> {
        None
    }

    fn wait_get_poses(&mut self, poses: &mut [TrackedDevicePose]) {
        poses[0].device_to_absolute[1][3] = 1.6;
        poses[0].pose_is_valid = true;
        poses[0].device_is_connected = true;
    }

    fn tracked_device_class(&mut self, index: u32) -> DeviceClass {
        if index == 0 {
            DeviceClass::Hmd
        } else {
            DeviceClass::Invalid
        }
    }

    fn string_property(&mut self, _index: u32, prop: TrackedDeviceProperty) -> Option<String> {
        Some(match prop {
            TrackedDeviceProperty::TrackingSystemName => "demo".to_string(),
            TrackedDeviceProperty::ModelNumber => "static".to_string(),
            TrackedDeviceProperty::SerialNumber => "0000".to_string(),
        })
    }
}

fn main() {
    env_logger::init();

    let config = PipelineConfig::from_env();
    let device = TestPattern {
        color: config.color_resolution,
        depth: config.depth_resolution,
        tick: 0,
    };

    let mut pipeline = match Pipeline::connect(
        device,
        StaticHeadset,
        protocol::default_endpoint(),
        config,
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    let poses = pipeline.sampler_mut().subscribe(1);
    let watcher = std::thread::spawn(move || {
        for snapshot in poses.iter().step_by(100) {
            for sample in &snapshot.samples {
                let t = &sample.transform;
                println!(
                    "refresh={:<8} {:?} {}  pos=[{:+.3}, {:+.3}, {:+.3}]",
                    snapshot.refresh,
                    sample.device_class,
                    sample.device_index,
                    t[0][3],
                    t[1][3],
                    t[2][3],
                );
            }
        }
    });

    println!("Streaming to {} ...", protocol::default_endpoint());
    match pipeline.run() {
        Ok(stats) => println!(
            "\nTotal: {} iterations, {} frames, {} bytes",
            stats.iterations, stats.frames_sent, stats.bytes_sent
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    watcher.join().ok();
}
