//! Result and error types for Tenaz.

use thiserror::Error;

/// Result type for Tenaz operations
pub type TenazResult<T> = Result<T, TenazError>;

/// Errors that can occur while resolving, finding or waiting on elements
#[derive(Debug, Error)]
pub enum TenazError {
    /// Addressing strategy is not one of the recognized names
    #[error("Unsupported locator strategy: {strategy:?}")]
    UnsupportedStrategy {
        /// Strategy name as supplied
        strategy: String,
    },

    /// Strategy passes validation but has no driver translation
    #[error("Case not implemented yet for strategy: {strategy}")]
    CaseNotImplemented {
        /// Canonical strategy name
        strategy: String,
    },

    /// Symbolic name absent from the active repository
    #[error("Locator {name:?} not found in repository {repository:?}")]
    LocatorNotFound {
        /// Symbolic element name
        name: String,
        /// Active repository name
        repository: String,
    },

    /// Repository entry carries a strategy that fails validation
    #[error("Invalid locator {name:?}: unsupported strategy {strategy:?}")]
    InvalidLocator {
        /// Symbolic element name
        name: String,
        /// Offending strategy
        strategy: String,
    },

    /// No element matched a single-element lookup
    #[error("Unable to locate an element using {query}")]
    ElementNotFound {
        /// Query that matched nothing
        query: String,
    },

    /// No element matched a multi-element lookup after the presence wait
    #[error("No elements found with {query} after {elapsed_ms}ms")]
    NoMatches {
        /// Query that matched nothing
        query: String,
        /// Time spent waiting for a match
        elapsed_ms: u64,
    },

    /// A previously obtained element reference no longer exists in the document
    #[error("Stale element reference: {element}")]
    StaleElement {
        /// Description of the stale element
        element: String,
    },

    /// Stale recovery could not rebuild the element
    #[error("Could not rebuild {element}: {reason} (recovering from: {stale})")]
    ReconstructionFailed {
        /// Description of the element being rebuilt
        element: String,
        /// Why the rebuild failed
        reason: String,
        /// The staleness that triggered the recovery
        stale: String,
    },

    /// A poll exceeded its budget
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// What was being waited for
        waited_for: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element exists but lacks the requested attribute
    #[error("Element {element} has no {attribute:?} attribute")]
    AttributeMissing {
        /// Description of the element
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// Driver session reported a failure other than staleness
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TenazError {
    /// Create a stale element error
    #[must_use]
    pub fn stale(element: impl Into<String>) -> Self {
        Self::StaleElement {
            element: element.into(),
        }
    }

    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for a stale element reference
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }

    /// True for a timed out poll
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the error only reports that nothing matched
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. } | Self::NoMatches { .. })
    }
}
