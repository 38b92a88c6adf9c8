//! The capture loop: tracking events, poses, one colour frame, one depth frame.
//!
//! The [`Pipeline`] owns every resource (sensor, tracking runtime, outbound
//! connection, pose table) and is the only place that decides to stop. Any
//! component error ends the run; resources are released in reverse order of
//! acquisition whatever the exit reason.

use crate::config::PipelineConfig;
use crate::error::KineticError;
use crate::protocol::RECORD_ORDER;
use crate::reader::FrameReader;
use crate::sender::{StreamSender, Transport};
use crate::sensor::SensorDevice;
use crate::stream::StreamHandle;
use crate::tracking::{PoseSampler, TrackingRuntime};
use crate::types::{InitFlags, StreamKind};
use crate::Result;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative stop signal, checked between loop iterations.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Counters from a run that ended without error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub iterations: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
}

/// Stream handles and session state acquired during start-up.
struct Acquired<S> {
    initialized: bool,
    depth: Option<StreamHandle<S>>,
    color: Option<StreamHandle<S>>,
}

pub struct Pipeline<D: SensorDevice, R: TrackingRuntime, T: Transport> {
    device: D,
    runtime: R,
    sender: StreamSender<T>,
    sampler: PoseSampler,
    config: PipelineConfig,
    shutdown: ShutdownHandle,
}

impl<D: SensorDevice, R: TrackingRuntime> Pipeline<D, R, TcpStream> {
    /// Connect to the frame consumer at `addr` and build a pipeline around it.
    pub fn connect(device: D, runtime: R, addr: SocketAddr, config: PipelineConfig) -> Result<Self> {
        let sender = StreamSender::connect(addr)?;
        Ok(Self::new(device, runtime, sender, config))
    }
}

impl<D: SensorDevice, R: TrackingRuntime, T: Transport> Pipeline<D, R, T> {
    pub fn new(device: D, runtime: R, sender: StreamSender<T>, config: PipelineConfig) -> Self {
        Self {
            device,
            runtime,
            sender,
            sampler: PoseSampler::new(),
            config,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Handle that stops [`run`](Self::run) at the next iteration boundary.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Pose table, e.g. to [`subscribe`](PoseSampler::subscribe) before running.
    pub fn sampler_mut(&mut self) -> &mut PoseSampler {
        &mut self.sampler
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start the streams, stream until stopped, then tear everything down.
    pub fn run(mut self) -> Result<PipelineStats> {
        let mut acquired = Acquired {
            initialized: false,
            depth: None,
            color: None,
        };

        let result = self.stream(&mut acquired);
        if let Err(e) = &result {
            log::error!("Pipeline stopped in {} stage: {}", e.stage(), e);
        }
        self.teardown(acquired, result)
    }

    fn stream(&mut self, acquired: &mut Acquired<D::Stream>) -> Result<PipelineStats> {
        self.device
            .initialize(InitFlags::USES_DEPTH | InitFlags::USES_COLOR)
            .map_err(KineticError::Init)?;
        acquired.initialized = true;

        let retry = self.config.open_retry;
        let depth = acquired.depth.insert(StreamHandle::open(
            &mut self.device,
            StreamKind::Depth,
            self.config.depth_resolution,
            &retry,
        )?);
        let color = acquired.color.insert(StreamHandle::open(
            &mut self.device,
            StreamKind::Color,
            self.config.color_resolution,
            &retry,
        )?);

        let reader = FrameReader::new(self.config.frame_timeout_ms, self.config.zero_pitch);

        if self.config.probe_on_start {
            for kind in RECORD_ORDER {
                let handle = match kind {
                    StreamKind::Color => &*color,
                    StreamKind::Depth => &*depth,
                };
                let frame = reader.read(&mut self.device, handle)?;
                log::info!(
                    "Probe {} frame {}x{} ok",
                    kind,
                    frame.width(),
                    frame.height()
                );
            }
        }

        log::info!("Streaming frames...");

        let mut stats = PipelineStats::default();
        let mut last_report = Instant::now();
        let mut window = PipelineStats::default();

        loop {
            if self.shutdown.is_requested() {
                log::info!("Shutdown requested, stopping after {} iteration(s)", stats.iterations);
                break;
            }
            if self
                .config
                .max_iterations
                .is_some_and(|max| stats.iterations >= max)
            {
                log::info!("Reached {} iteration(s), stopping", stats.iterations);
                break;
            }

            self.sampler.poll_events(&mut self.runtime);
            self.sampler.refresh_poses(&mut self.runtime);

            // Receivers tell records apart only by this order.
            for kind in RECORD_ORDER {
                let handle = match kind {
                    StreamKind::Color => &*color,
                    StreamKind::Depth => &*depth,
                };
                let frame = reader.read(&mut self.device, handle)?;
                let bytes_before = self.sender.bytes_sent();
                self.sender.send_frame(frame)?;
                let bytes = self.sender.bytes_sent() - bytes_before;
                stats.frames_sent += 1;
                stats.bytes_sent += bytes;
                window.frames_sent += 1;
                window.bytes_sent += bytes;
            }
            stats.iterations += 1;
            window.iterations += 1;

            let elapsed = last_report.elapsed();
            if elapsed >= self.config.report_interval {
                let secs = elapsed.as_secs_f64();
                log::info!(
                    "{:.1} it/s, {:.1} frames/s, {:.1} MiB/s",
                    window.iterations as f64 / secs,
                    window.frames_sent as f64 / secs,
                    window.bytes_sent as f64 / secs / (1024.0 * 1024.0)
                );
                window = PipelineStats::default();
                last_report = Instant::now();
            }
        }

        Ok(stats)
    }

    fn teardown(
        self,
        acquired: Acquired<D::Stream>,
        result: Result<PipelineStats>,
    ) -> Result<PipelineStats> {
        let Pipeline {
            mut device,
            mut runtime,
            sender,
            ..
        } = self;

        if let Some(mut color) = acquired.color {
            color.close(&mut device);
        }
        if let Some(mut depth) = acquired.depth {
            depth.close(&mut device);
        }
        if acquired.initialized {
            device.shutdown();
        }
        runtime.shutdown();

        match sender.close() {
            Ok(_) => result,
            Err(e) => {
                log::error!("shutdown failed ({})", e);
                match result {
                    Ok(_) => Err(KineticError::Shutdown(e)),
                    Err(run_err) => Err(run_err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_handle_is_shared() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_requested());
        handle.request();
        assert!(clone.is_requested());
    }
}
