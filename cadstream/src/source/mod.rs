//! Where model files come from.
//!
//! A [`ModelSource`] serves raw files by name. [`SceneFetcher`] sits on top
//! of a source and implements the coordinators' fetch delegates by looking
//! up each sector's file names in the scene metadata.
//!
//! ```text
//! SectorLoadCoordinator ──► SceneFetcher ──► RetryingFetcher ──► DirectorySource
//!                           (id → name)      (RetryPolicy)   └─► HttpSource
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cadstream::source::{DirectorySource, RetryPolicy, RetryingFetcher};
//!
//! let source = RetryingFetcher::new(DirectorySource::new("./model"), RetryPolicy::default());
//! let scene = source.fetch_file("scene.json").await?;
//! ```

mod directory;
mod http;
mod layout;
mod retry;
mod traits;

pub use directory::DirectorySource;
pub use http::{HttpSource, DEFAULT_TIMEOUT_SECS};
pub use layout::{geometry_file_name, SceneFetcher};
pub use retry::{
    RetryPolicy, RetryingFetcher, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
pub use traits::ModelSource;

/// Open a directory path or an `http(s)://` URL as a source.
pub fn open(location: &str) -> Result<Box<dyn ModelSource>, reqwest::Error> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location)?))
    } else {
        Ok(Box::new(DirectorySource::new(location)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_picks_source_by_scheme() {
        assert_eq!(open("https://host/model").unwrap().describe(), "https://host/model");
        assert_eq!(open("/data/model").unwrap().describe(), "/data/model");
    }
}
