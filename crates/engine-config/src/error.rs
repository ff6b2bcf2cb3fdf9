use thiserror::Error;

/// Errors raised while reading and validating the transfer settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required variable is unset or empty.
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set to a value that cannot be used.
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl SettingsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SettingsError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}
