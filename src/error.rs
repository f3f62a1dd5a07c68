use thiserror::Error;

/// Error taxonomy for the crawl/parse pipeline. Only `Configuration` and `IOError` (on
/// writer creation) are treated as fatal by the driver; the rest are recorded and the
/// crawl continues.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("throttled fetching {url} (status {status})")]
    Throttled { url: String, status: u16 },

    #[error("page at {url} had no recognizable content")]
    ParseEmpty { url: String },

    #[error("clause could not be parsed: {clause:?}")]
    UnparsedClause { clause: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error writing {path}: {source}")]
    IOError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CrawlResult<T> = Result<T, CrawlError>;
