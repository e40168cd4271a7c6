use shared::ValidationErrors;
use thiserror::Error;

/// Failure classes of the resource boundary. `Clone` because failed cell
/// populations are rendezvoused through shared futures: every concurrent
/// caller receives its own copy of the same rejection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Network or resource layer failure fetching a query or entity page.
    #[error("failed to fetch {what}: {reason}")]
    Fetch { what: String, reason: String },

    /// Structured validation or conflict error from a save attempt.
    /// The entity stays dirty; the caller reacts per field.
    #[error("work item '{subject}' could not be saved")]
    Save {
        subject: String,
        errors: ValidationErrors,
    },

    /// A schema round-trip failed. The affected cell stays pristine so a
    /// later load is retried fresh instead of caching a broken state.
    #[error("failed to load schema {href}: {reason}")]
    SchemaLoad { href: String, reason: String },
}

impl EngineError {
    pub fn fetch(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
