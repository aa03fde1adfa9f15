//! In-memory device collaborators for tests and the command-line driver

use async_trait::async_trait;
use gigclock_api::Coordinate;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::{DeviceError, DeviceResult, LocationProvider, Verifier};

/// Location provider that reports a fixed, replaceable position
pub struct FixedLocation {
    coordinate: Mutex<Option<Coordinate>>,
}

impl FixedLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Mutex::new(Some(coordinate)),
        }
    }

    /// A provider that has no fix, like a device with positioning switched off
    pub fn unavailable() -> Self {
        Self {
            coordinate: Mutex::new(None),
        }
    }

    /// Move the simulated device
    pub fn set(&self, coordinate: Option<Coordinate>) {
        if let Ok(mut slot) = self.coordinate.lock() {
            *slot = coordinate;
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_coordinate(&self) -> DeviceResult<Coordinate> {
        let slot = self
            .coordinate
            .lock()
            .map_err(|_| DeviceError::LocationUnavailable("provider lock poisoned".into()))?;
        slot.ok_or_else(|| DeviceError::LocationUnavailable("no position fix".into()))
    }

    fn is_healthy(&self) -> bool {
        self.coordinate.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}

/// Verifier that replays a queue of outcomes, one per attempt
pub struct ScriptedVerifier {
    outcomes: Mutex<VecDeque<bool>>,
    delay: Option<Duration>,
    attempts: AtomicU64,
}

impl ScriptedVerifier {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            delay: None,
            attempts: AtomicU64::new(0),
        }
    }

    /// Simulate a slow recognition backend
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of verification attempts made so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self) -> DeviceResult<bool> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut outcomes = self
            .outcomes
            .lock()
            .map_err(|_| DeviceError::VerificationUnavailable("verifier lock poisoned".into()))?;
        outcomes
            .pop_front()
            .ok_or_else(|| DeviceError::VerificationUnavailable("no outcome scripted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locate_within, verify_within};

    #[tokio::test]
    async fn fixed_location_reports_and_moves() {
        let here = Coordinate::new(39.908823, 116.397470).unwrap();
        let provider = FixedLocation::new(here);
        assert_eq!(provider.current_coordinate().await.unwrap(), here);

        provider.set(None);
        assert!(matches!(
            provider.current_coordinate().await,
            Err(DeviceError::LocationUnavailable(_))
        ));
        assert!(!provider.is_healthy());
    }

    #[tokio::test]
    async fn scripted_verifier_replays_outcomes() {
        let verifier = ScriptedVerifier::new([false, true]);
        assert!(!verifier.verify().await.unwrap());
        assert!(verifier.verify().await.unwrap());
        assert!(verifier.verify().await.is_err());
        assert_eq!(verifier.attempts(), 3);
    }

    #[tokio::test]
    async fn slow_verifier_times_out() {
        let verifier = ScriptedVerifier::new([true]).with_delay(Duration::from_millis(200));
        let result = verify_within(&verifier, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(DeviceError::Timeout { operation: "verification", .. })));
    }

    #[tokio::test]
    async fn locate_within_passes_through_errors() {
        let provider = FixedLocation::unavailable();
        let result = locate_within(&provider, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DeviceError::LocationUnavailable(_))));
    }
}
