use thiserror::Error;

/// Errors that can occur when talking to an object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport or protocol error from the S3-compatible backend.
    #[error("s3 request failed: {0}")]
    S3(#[from] s3::error::S3Error),

    /// Credentials could not be resolved.
    #[error("credentials error: {0}")]
    Credentials(#[from] s3::creds::error::CredentialsError),

    /// The backend answered with a status code outside the success range.
    #[error("unexpected status code {code} for object `{key}`")]
    UnexpectedStatus {
        /// The object key the request was for.
        key: String,
        /// The HTTP status code of the response.
        code: u16,
    },

    /// The stat response did not carry a usable content length.
    #[error("object `{key}` has no declared content length")]
    MissingSize {
        /// The object key the stat call was for.
        key: String,
    },

    /// The object cannot be retrieved.
    #[error("object `{key}` is not retrievable")]
    Unavailable {
        /// The object key.
        key: String,
    },

    /// An I/O error while streaming.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
