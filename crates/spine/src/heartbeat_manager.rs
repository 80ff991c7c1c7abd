use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use spine_model::payloads::DeviceDiagnosisHeartbeatData;
use spine_model::{CmdPayload, Function, XsDuration};
use tokio_util::sync::CancellationToken;

use crate::device_local::DeviceLocalInner;
use crate::error::SpineError;
use crate::feature_local::FeatureLocal;

/// Periodic liveness signal bound to the device's heartbeat server feature.
///
/// Runs while at least one remote client is subscribed to the heartbeat
/// function: starting requires a subscriber, and the device's subscription
/// dispatch stops the heartbeat implicitly when the last subscriber goes.
pub struct HeartbeatManager {
    device: Weak<DeviceLocalInner>,
    timeout: Duration,
    counter: Arc<AtomicU64>,
    running: Mutex<Option<CancellationToken>>,
}

impl HeartbeatManager {
    pub(crate) fn new(device: Weak<DeviceLocalInner>, timeout: Duration) -> Self {
        Self {
            device,
            timeout,
            counter: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.running.lock().expect("heartbeat state poisoned").is_some()
    }

    /// Starts the heartbeat: emits counter value 1 immediately, then ticks
    /// once per configured interval. Fails without a heartbeat-capable local
    /// server feature or without any subscriber for it. Idempotent while
    /// running.
    pub fn start_heartbeat(&self) -> Result<(), SpineError> {
        let device = self
            .device
            .upgrade()
            .ok_or_else(|| SpineError::AddressNotFound("local device dropped".to_string()))?;
        let feature = device.heartbeat_feature().ok_or_else(|| {
            SpineError::AddressNotFound(
                "no local server feature hosts the heartbeat function".to_string(),
            )
        })?;
        if device.subscription_manager().subscriptions_on_feature(feature.address()).is_empty() {
            return Err(SpineError::CommandRejected(
                "no subscriber for the heartbeat function".to_string(),
            ));
        }

        let token = {
            let mut running = self.running.lock().expect("heartbeat state poisoned");
            if running.is_some() {
                return Ok(());
            }
            let token = CancellationToken::new();
            *running = Some(token.clone());
            token
        };

        self.counter.store(0, Ordering::Relaxed);
        tick(&feature, &self.counter, self.timeout);

        let counter = Arc::clone(&self.counter);
        let interval = self.timeout;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => tick(&feature, &counter, interval),
                }
            }
        });

        Ok(())
    }

    /// Cancels the repeating task. Idempotent when already stopped.
    pub fn stop_heartbeat(&self) {
        if let Some(token) = self.running.lock().expect("heartbeat state poisoned").take() {
            token.cancel();
        }
    }
}

fn tick(feature: &FeatureLocal, counter: &AtomicU64, timeout: Duration) {
    let value = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    feature.set_data(
        Function::DeviceDiagnosisHeartbeatData,
        CmdPayload::DeviceDiagnosisHeartbeatData(DeviceDiagnosisHeartbeatData {
            timestamp: None,
            heartbeat_counter: Some(value),
            heartbeat_timeout: Some(XsDuration::from_duration(timeout)),
        }),
    );
}
