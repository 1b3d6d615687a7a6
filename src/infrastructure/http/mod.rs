//! Network adapters.

pub mod fetcher;

pub use fetcher::HttpImageFetcher;
