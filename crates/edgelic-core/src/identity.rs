//! # Module Identity
//!
//! The three identity strings a license is bound to: the module instance
//! name, the edge device (host) name and the IoT Hub name. On an IoT Edge
//! device these come from `IOTEDGE_MODULEID`, `IOTEDGE_DEVICEID` and
//! `IOTEDGE_IOTHUBHOSTNAME`; loading them is the caller's concern; this
//! type only guarantees they are present and non-blank.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an identity value is missing or blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The named value was empty or whitespace only.
    #[error("{0} is null or blank")]
    Blank(&'static str),
}

/// Identity of the module instance enforcing a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleIdentity {
    module_instance_name: String,
    host_name: String,
    hub_name: String,
}

impl ModuleIdentity {
    /// Build an identity, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Blank`] naming the first blank value.
    pub fn new(
        module_instance_name: impl Into<String>,
        host_name: impl Into<String>,
        hub_name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let module_instance_name = module_instance_name.into();
        let host_name = host_name.into();
        let hub_name = hub_name.into();

        require_non_blank("module instance name", &module_instance_name)?;
        require_non_blank("host name", &host_name)?;
        require_non_blank("hub name", &hub_name)?;

        Ok(Self {
            module_instance_name,
            host_name,
            hub_name,
        })
    }

    /// The module instance name (`IOTEDGE_MODULEID`).
    pub fn module_instance_name(&self) -> &str {
        &self.module_instance_name
    }

    /// The edge device name (`IOTEDGE_DEVICEID`).
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// The IoT Hub host name (`IOTEDGE_IOTHUBHOSTNAME`).
    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }
}

impl std::fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}/{}",
            self.module_instance_name, self.host_name, self.hub_name
        )
    }
}

/// Reject empty or whitespace-only values.
pub fn require_non_blank(name: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::Blank(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_blank_values() {
        let id = ModuleIdentity::new("modulename", "myedgehost", "myiothub").unwrap();
        assert_eq!(id.module_instance_name(), "modulename");
        assert_eq!(id.host_name(), "myedgehost");
        assert_eq!(id.hub_name(), "myiothub");
    }

    #[test]
    fn rejects_blank_module() {
        let err = ModuleIdentity::new("  ", "host", "hub").unwrap_err();
        assert_eq!(err, IdentityError::Blank("module instance name"));
    }

    #[test]
    fn rejects_empty_host() {
        let err = ModuleIdentity::new("module", "", "hub").unwrap_err();
        assert_eq!(err, IdentityError::Blank("host name"));
    }

    #[test]
    fn rejects_blank_hub() {
        let err = ModuleIdentity::new("module", "host", "\t").unwrap_err();
        assert!(format!("{err}").contains("hub name"));
    }

    #[test]
    fn display_joins_all_parts() {
        let id = ModuleIdentity::new("m", "h", "hub.azure-devices.net").unwrap();
        assert_eq!(id.to_string(), "m@h/hub.azure-devices.net");
    }
}
