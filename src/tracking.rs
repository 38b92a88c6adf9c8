use crate::transform::{self, Mat4};
use crate::types::{
    DeviceClass, PoseSample, TrackedDevicePose, TrackedDeviceProperty, TrackingEvent,
    TrackingEventKind, MAX_TRACKED_DEVICES,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Contract the sampler needs from the VR tracking runtime.
///
/// Runtime start-up happens elsewhere; the implementation wraps a live
/// session.
pub trait TrackingRuntime {
    /// Next pending event, or `None` once the queue is empty.
    fn poll_next_event(&mut self) -> Option<TrackingEvent>;

    /// Block until the compositor hands out poses, filling every slot.
    fn wait_get_poses(&mut self, poses: &mut [TrackedDevicePose]);

    fn tracked_device_class(&mut self, index: u32) -> DeviceClass;

    /// `None` when the property is unavailable for this device.
    fn string_property(&mut self, index: u32, prop: TrackedDeviceProperty) -> Option<String>;

    fn shutdown(&mut self) {}
}

/// Classified poses after one refresh, handed to display consumers.
#[derive(Debug, Clone)]
pub struct PoseSnapshot {
    pub refresh: u64,
    pub samples: Vec<PoseSample>,
}

/// Fixed-size pose table refreshed from the tracking runtime.
pub struct PoseSampler {
    raw: Vec<TrackedDevicePose>,
    table: Vec<PoseSample>,
    refreshes: u64,
    subscribers: Vec<Sender<PoseSnapshot>>,
}

impl Default for PoseSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSampler {
    pub fn new() -> Self {
        Self {
            raw: vec![TrackedDevicePose::default(); MAX_TRACKED_DEVICES],
            table: (0..MAX_TRACKED_DEVICES as u32).map(PoseSample::new).collect(),
            refreshes: 0,
            subscribers: Vec::new(),
        }
    }

    /// Receive a [`PoseSnapshot`] after every refresh.
    ///
    /// Snapshots are dropped while the channel is full; a dropped receiver
    /// unsubscribes.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<PoseSnapshot> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        self.subscribers.push(sender);
        receiver
    }

    /// Drain the runtime's event queue, logging device transitions.
    ///
    /// Does not touch the pose table. Returns the number of events drained.
    pub fn poll_events<R: TrackingRuntime + ?Sized>(&mut self, runtime: &mut R) -> usize {
        let mut drained = 0;
        while let Some(event) = runtime.poll_next_event() {
            drained += 1;
            match event.kind {
                TrackingEventKind::DeviceActivated => {
                    log::debug!("Device {} activated.", event.device_index)
                }
                TrackingEventKind::DeviceDeactivated => {
                    log::debug!("Device {} detached.", event.device_index)
                }
                TrackingEventKind::DeviceUpdated => {
                    log::debug!("Device {} updated.", event.device_index)
                }
                TrackingEventKind::Other(code) => {
                    log::trace!("Ignoring tracking event {} for device {}", code, event.device_index)
                }
            }
        }
        drained
    }

    /// Fetch one synchronized pose set and fold it into the table.
    ///
    /// Valid poses are converted to Z-up and stored. Invalid slots keep their
    /// previous transform and are marked stale. A slot's class is queried
    /// only on its first valid pose.
    pub fn refresh_poses<R: TrackingRuntime + ?Sized>(&mut self, runtime: &mut R) {
        runtime.wait_get_poses(&mut self.raw);
        self.refreshes += 1;

        for (index, (raw, sample)) in self.raw.iter().zip(self.table.iter_mut()).enumerate() {
            if !raw.pose_is_valid {
                sample.fresh = false;
                continue;
            }

            sample.transform = transform::to_z_up(&transform::from_device_matrix34(
                &raw.device_to_absolute,
            ));
            sample.fresh = true;
            sample.last_valid_refresh = Some(self.refreshes);

            if sample.device_class == DeviceClass::Invalid {
                let index = index as u32;
                sample.device_class = runtime.tracked_device_class(index);
                if sample.is_classified() {
                    let system = runtime
                        .string_property(index, TrackedDeviceProperty::TrackingSystemName)
                        .unwrap_or_default();
                    sample.serial_number =
                        runtime.string_property(index, TrackedDeviceProperty::SerialNumber);
                    log::info!(
                        "Tracking {} {} [{}] {}",
                        sample.device_class.label().unwrap_or("device"),
                        index,
                        system,
                        sample.serial_number.as_deref().unwrap_or("?")
                    );
                }
            }
        }

        self.publish();
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = PoseSnapshot {
            refresh: self.refreshes,
            samples: self.classified().cloned().collect(),
        };
        self.subscribers
            .retain(|sender| match sender.try_send(snapshot.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::trace!("Pose channel full, dropping snapshot");
                    true
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("Pose subscriber disconnected");
                    false
                }
            });
    }

    /// Number of refreshes performed so far.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn sample(&self, index: u32) -> Option<&PoseSample> {
        self.table.get(index as usize)
    }

    pub fn samples(&self) -> &[PoseSample] {
        &self.table
    }

    /// Slots that have been classified, in index order.
    pub fn classified(&self) -> impl Iterator<Item = &PoseSample> {
        self.table.iter().filter(|s| s.is_classified())
    }

    /// Latest transform for the first classified device of `class`.
    pub fn first_of(&self, class: DeviceClass) -> Option<&Mat4> {
        self.classified()
            .find(|s| s.device_class == class)
            .map(|s| &s.transform)
    }
}
