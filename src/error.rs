use thiserror::Error;

/// Failure while walking a product's remote node tree.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unable to parse node listing: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Failure while retrieving the bytes of a resolved asset.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unable to write asset: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
#[error("Unable to get asset file name from URL \"{url}\"")]
pub struct NamingError {
    pub url: String,
}

/// Why a product contributed nothing to the output sequence.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("locate failed: {0}")]
    Locate(#[from] LocateError),
    #[error("no matching asset in any granule")]
    NotFound,
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("file {0} is in the skip list")]
    Excluded(String),
    #[error("task aborted: {0}")]
    Aborted(String),
}

impl SkipReason {
    /// Short name of the stage that produced the skip, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Locate(_) => "locate",
            Self::NotFound => "not-found",
            Self::Naming(_) => "naming",
            Self::Fetch(_) => "fetch",
            Self::Excluded(_) => "excluded",
            Self::Aborted(_) => "task",
        }
    }
}

/// Errors that prevent a pipeline from starting at all.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("max_in_flight must be at least 1")]
    ZeroConcurrency,
}
