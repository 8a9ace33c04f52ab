use thiserror::Error;

/// Errors raised while assembling a page archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Serialize(#[from] ion_serializer::SerializeError),

    #[error(transparent)]
    Tar(#[from] ion_tar::TarError),

    #[error("failed to encode archive manifest")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
