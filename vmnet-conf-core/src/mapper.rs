//! The name/device mapping contract shared by `netmap.conf` and `networking`.

use thiserror::Error;

/// Errors returned by [`NetworkNameMapper`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("error finding network name: {0}")]
    UnknownName(String),
    #[error("error finding device name: {0}")]
    UnknownDevice(String),
    #[error("unable to determine network type for device {0}")]
    UnclassifiedDevice(String),
    #[error("malformed device name: {0}")]
    InvalidDevice(String),
}

/// Translate between user-facing network names and host device names.
pub trait NetworkNameMapper {
    /// Every device carrying `name`, compared case-insensitively.
    fn name_into_devices(&self, name: &str) -> Result<Vec<String>, LookupError>;

    /// The network name for `device`.
    fn device_into_name(&self, device: &str) -> Result<String, LookupError>;
}
