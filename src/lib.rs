//! # kineticscan - depth camera frame streaming with VR pose sampling
//!
//! Pulls colour and depth images from a depth camera and streams them to a
//! consumer over one TCP connection, while polling a VR tracking runtime for
//! device poses. Provides:
//! - Bounded-retry stream opening and frame copying over a [`SensorDevice`]
//! - The `{u32 width}{u32 height}{pixels}` wire format, colour then depth
//! - A pose table with Z-up conversion over a [`TrackingRuntime`]
//! - A single-threaded [`Pipeline`] driving all of the above
//!
//! ## Quick Start
//! ```no_run
//! # fn demo<D: kineticscan::SensorDevice, R: kineticscan::TrackingRuntime>(device: D, runtime: R) {
//! use kineticscan::{protocol, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::connect(
//!     device,
//!     runtime,
//!     protocol::default_endpoint(),
//!     PipelineConfig::default(),
//! )
//! .unwrap();
//! let stop = pipeline.shutdown_handle();
//! // call `stop.request()` from elsewhere to end the run
//! let stats = pipeline.run().unwrap();
//! println!("sent {} frames", stats.frames_sent);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod reader;
pub mod receiver;
pub mod sender;
pub mod sensor;
pub mod stream;
pub mod tracking;
pub mod transform;
pub mod types;

pub use config::PipelineConfig;
pub use error::{DeviceError, KineticError, OpenError, ReadError, ReceiveError, SendError};
pub use pipeline::{Pipeline, PipelineStats, ShutdownHandle};
pub use reader::{FrameReader, ZeroPitchPolicy};
pub use receiver::{FramePair, FrameReceiver};
pub use sender::{StreamSender, Transport};
pub use sensor::{LockedRect, SensorDevice};
pub use stream::{OpenRetry, StreamHandle};
pub use tracking::{PoseSampler, PoseSnapshot, TrackingRuntime};
pub use types::*;

/// Result type alias for kineticscan operations.
pub type Result<T> = std::result::Result<T, KineticError>;
