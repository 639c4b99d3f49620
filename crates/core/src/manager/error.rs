use thiserror::Error;

/// Errors returned by [`super::ConversionManager`] requests.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Conversion manager is not running")]
    Stopped,
}
