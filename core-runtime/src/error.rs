use thiserror::Error;

/// Errors raised while assembling the runtime: configuration, bridge
/// resolution and the global subscriber.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bridge the configuration needs was neither injected nor available
    /// as a desktop default.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    pub fn capability_missing(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Name of the missing bridge, if this is a capability error.
    pub fn missing_capability(&self) -> Option<&str> {
        match self {
            Error::CapabilityMissing { capability, .. } => Some(capability),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_errors_name_the_bridge() {
        let err = Error::capability_missing("SettingsStore", "inject one");
        assert_eq!(err.missing_capability(), Some("SettingsStore"));
        assert_eq!(
            err.to_string(),
            "Capability missing: SettingsStore - inject one"
        );
        assert_eq!(Error::Config("bad".into()).missing_capability(), None);
    }
}
