use std::io;

use thiserror::Error;

/// Errors raised while assembling or streaming an archive.
#[derive(Debug, Error)]
pub enum TarError {
    #[error("archive entry {name:?}: source file unavailable")]
    SourceUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("archive entry {name:?} not prepared before streaming")]
    NotPrepared { name: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = TarError> = std::result::Result<T, E>;
