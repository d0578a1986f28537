use thiserror::Error;

/// A pipeline error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A pipeline error.
///
/// Enrichment failures are deliberately absent: a geolocation or
/// reputation provider failure degrades the affected hop to "no data"
/// and never aborts the trace. See [`ProviderError`].
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed IP address text reached the classifier.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The discovery stream itself failed, no report can be produced.
    #[error("probe failed: {0}")]
    ProbeFailed(String),
    /// The pipeline was built with an invalid configuration.
    #[error("invalid config: {0}")]
    BadConfig(String),
}

/// A geolocation or reputation provider call error.
///
/// Always recovered locally by the resolvers: logged and treated as
/// "no data" for the hop being enriched.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider could not be reached or the call was aborted.
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider answered with an unexpected status.
    #[error("unexpected status: {0}")]
    Status(u16),
    /// The provider payload could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),
}
