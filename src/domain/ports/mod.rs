mod clock_port;
mod fetch_port;
mod storage_port;

pub use clock_port::Clock;
pub use fetch_port::ImageFetcher;
pub use storage_port::StorageBackend;

#[cfg(test)]
pub use fetch_port::MockImageFetcher;
