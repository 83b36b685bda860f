pub type ImseqResult<T> = Result<T, ImseqError>;

#[derive(thiserror::Error, Debug)]
pub enum ImseqError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("capability error: {0}")]
    Capability(String),

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("missing file: {0}")]
    MissingFile(String),

    #[error("path ambiguity: {0}")]
    AmbiguousPath(String),

    #[error("backing store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImseqError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn missing_file(msg: impl Into<String>) -> Self {
        Self::MissingFile(msg.into())
    }

    pub fn ambiguous_path(msg: impl Into<String>) -> Self {
        Self::AmbiguousPath(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for ImseqError {
    fn from(err: hdf5::Error) -> Self {
        Self::Store(err.to_string())
    }
}
