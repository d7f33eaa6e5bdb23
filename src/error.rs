use thiserror::Error;

/// Failures that escape an [`crate::render::ImageMapEncoder::encode`] call.
#[derive(Debug, Error)]
pub enum Error {
    /// Stream or cursor failure while the request was not aborted. Unexpected
    /// failures and CRS setup failures raised inside a layer loop are wrapped
    /// into this variant too.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to set up CRS {code}: {reason}")]
    Crs { code: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures local to one feature or one geometry component. These are logged
/// and the unit is dropped; they never abort a layer.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("world to screen transform is not invertible")]
    NonInvertible,

    #[error("buffering the line did not yield a single polygon")]
    BufferNotPolygon,

    #[error("nothing to encode")]
    Empty,

    #[error("unsupported mark shape: {0}")]
    UnsupportedMark(String),

    #[error("failed to reproject feature: {0}")]
    Reproject(String),

    #[error("failed to format shape: {0}")]
    Format(#[from] std::fmt::Error),
}
