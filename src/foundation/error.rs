/// Convenience result type used across panoframe.
pub type PanoResult<T> = Result<T, PanoError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum PanoError {
    /// Malformed command, option set, or geometry. The offending input is ignored.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A render target or output sink could not be created.
    #[error("resource allocation error: {0}")]
    ResourceAllocation(String),

    /// A startup collaborator (e.g. the orientation feed) is unavailable.
    #[error("init error: {0}")]
    Init(String),

    /// Still or video encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing persisted documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PanoError {
    /// Build a [`PanoError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`PanoError::ResourceAllocation`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceAllocation(msg.into())
    }

    /// Build a [`PanoError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Build a [`PanoError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`PanoError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
