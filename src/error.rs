//! Error taxonomy for the publish pipeline.

use thiserror::Error;

/// Failures a publish request can end in.
///
/// Only `Validation` and `CredentialNotFound` stop a request before any
/// external call. `Persistence` never reaches the caller; sinks log it and
/// carry on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// A required request field is missing or empty.
    #[error("missing required field: {field}")]
    Validation {
        /// Name of the offending field.
        field: String,
    },

    /// Neither credential generation holds a pair for the principal.
    #[error("no credentials for {principal}")]
    CredentialNotFound {
        /// The normalized principal name.
        principal: String,
    },

    /// The wiki refused the edit.
    #[error("edit rejected: {category}")]
    EditRejected {
        /// Category from the edit signature list.
        category: String,
    },

    /// The wiki asked for a captcha before accepting the edit.
    #[error("captcha required")]
    CaptchaRequired,

    /// The knowledge-base link step failed.
    #[error("link failed: {category}")]
    LinkFailure {
        /// Category from the link signature list.
        category: String,
    },

    /// An audit sink could not persist a record.
    #[error("persistence failed in {sink} sink: {message}")]
    Persistence {
        /// Which sink failed (`file` or `table`).
        sink: &'static str,
        /// Underlying error text.
        message: String,
    },
}

impl PublishError {
    /// Stable short code used in response bodies.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { .. } => "invalid",
            Self::CredentialNotFound { .. } => "noaccess",
            Self::EditRejected { category } | Self::LinkFailure { category } => category,
            Self::CaptchaRequired => "captcha",
            Self::Persistence { .. } => "persistence",
        }
    }
}

/// Problems loading [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable the requested mode cannot run without is unset.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_categories() {
        let rejected = PublishError::EditRejected { category: "protectedpage".into() };
        assert_eq!(rejected.code(), "protectedpage");
        let missing = PublishError::CredentialNotFound { principal: "Someone".into() };
        assert_eq!(missing.code(), "noaccess");
        assert_eq!(PublishError::CaptchaRequired.code(), "captcha");
    }

    #[test]
    fn validation_message_names_field() {
        let err = PublishError::Validation { field: "title".into() };
        assert_eq!(err.to_string(), "missing required field: title");
    }
}
