/// Errors raised by the configuration tree engine.
///
/// These travel inside `anyhow::Error`; callers that need to branch on the
/// kind use `err.downcast_ref::<TreeError>()`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("an element or group named '{0}' already exists")]
    Duplicate(String),

    #[error("group '{0}' still has child groups or elements")]
    NonEmpty(String),

    #[error("cannot publish '{0}': its parent group is not published")]
    ParentNotPublished(String),

    #[error("cycle detected at group {0}")]
    CycleDetected(String),

    #[error("configuration tree is deeper than {0} levels")]
    DepthLimit(usize),

    #[error("no configuration available for device {0}")]
    NoConfiguration(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl TreeError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
