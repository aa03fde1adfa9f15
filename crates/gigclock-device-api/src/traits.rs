//! Device collaborator traits

use async_trait::async_trait;
use gigclock_api::Coordinate;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors from device collaborators
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Verification unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Source of the device's current position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Take a single position fix
    async fn current_coordinate(&self) -> DeviceResult<Coordinate>;

    /// Optional: check if the positioning backend is usable
    fn is_healthy(&self) -> bool {
        true
    }
}

/// External identity-verification capability (e.g. face match)
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Run one verification attempt; `Ok(false)` means the identity did not match
    async fn verify(&self) -> DeviceResult<bool>;
}

/// Take a position fix, giving up after `timeout`
pub async fn locate_within(
    provider: &dyn LocationProvider,
    timeout: Duration,
) -> DeviceResult<Coordinate> {
    match tokio::time::timeout(timeout, provider.current_coordinate()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Location request timed out");
            Err(DeviceError::Timeout {
                operation: "location",
                timeout,
            })
        }
    }
}

/// Run one verification attempt, giving up after `timeout`
pub async fn verify_within(verifier: &dyn Verifier, timeout: Duration) -> DeviceResult<bool> {
    match tokio::time::timeout(timeout, verifier.verify()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Verification timed out");
            Err(DeviceError::Timeout {
                operation: "verification",
                timeout,
            })
        }
    }
}
