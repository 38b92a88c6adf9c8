use crate::reader::{ZeroPitchPolicy, DEFAULT_FRAME_TIMEOUT_MS};
use crate::stream::OpenRetry;
use crate::types::{Resolution, StreamKind};
use std::time::Duration;

/// Knobs for a [`Pipeline`](crate::pipeline::Pipeline) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub color_resolution: Resolution,
    pub depth_resolution: Resolution,
    pub frame_timeout_ms: u32,
    pub open_retry: OpenRetry,
    pub zero_pitch: ZeroPitchPolicy,
    /// Read and discard one colour and one depth frame before streaming.
    pub probe_on_start: bool,
    /// Stop cleanly after this many loop iterations.
    pub max_iterations: Option<u64>,
    /// How often throughput is logged.
    pub report_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_resolution: StreamKind::Color.default_resolution(),
            depth_resolution: StreamKind::Depth.default_resolution(),
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            open_retry: OpenRetry::default(),
            zero_pitch: ZeroPitchPolicy::Abort,
            probe_on_start: true,
            max_iterations: None,
            report_interval: Duration::from_secs(5),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `KINETIC_*` environment variables.
    ///
    /// - `KINETIC_FRAME_TIMEOUT_MS`
    /// - `KINETIC_OPEN_ATTEMPTS`
    /// - `KINETIC_OPEN_DELAY_MS` (0 = yield only)
    /// - `KINETIC_ZERO_PITCH` (`abort` | `empty`)
    /// - `KINETIC_PROBE` (bool)
    /// - `KINETIC_MAX_ITERATIONS` (0 = unbounded)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut open_retry = OpenRetry::new(read_env_u32(
            "KINETIC_OPEN_ATTEMPTS",
            defaults.open_retry.max_attempts,
        ));
        let delay_ms = read_env_u32("KINETIC_OPEN_DELAY_MS", 0);
        if delay_ms > 0 {
            open_retry = open_retry.with_delay(Duration::from_millis(delay_ms as u64));
        }

        let zero_pitch = match read_env_string("KINETIC_ZERO_PITCH", "abort").as_str() {
            "abort" => ZeroPitchPolicy::Abort,
            "empty" => ZeroPitchPolicy::EmptyFrame,
            other => {
                log::warn!(
                    "Unknown KINETIC_ZERO_PITCH='{}', using abort (supported: abort|empty)",
                    other
                );
                ZeroPitchPolicy::Abort
            }
        };

        let max_iterations = match read_env_u32("KINETIC_MAX_ITERATIONS", 0) {
            0 => None,
            n => Some(n as u64),
        };

        Self {
            frame_timeout_ms: read_env_u32("KINETIC_FRAME_TIMEOUT_MS", defaults.frame_timeout_ms),
            open_retry,
            zero_pitch,
            probe_on_start: read_env_bool("KINETIC_PROBE", defaults.probe_on_start),
            max_iterations,
            ..defaults
        }
    }

    pub fn with_resolutions(mut self, color: Resolution, depth: Resolution) -> Self {
        self.color_resolution = color;
        self.depth_resolution = depth;
        self
    }

    pub fn with_frame_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.frame_timeout_ms = timeout_ms;
        self
    }

    pub fn with_open_retry(mut self, retry: OpenRetry) -> Self {
        self.open_retry = retry;
        self
    }

    pub fn with_zero_pitch(mut self, policy: ZeroPitchPolicy) -> Self {
        self.zero_pitch = policy;
        self
    }

    pub fn with_probe_on_start(mut self, probe: bool) -> Self {
        self.probe_on_start = probe;
        self
    }

    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn resolution(&self, kind: StreamKind) -> Resolution {
        match kind {
            StreamKind::Color => self.color_resolution,
            StreamKind::Depth => self.depth_resolution,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
