//! Domain error types.

mod fetch_error;
mod storage_error;

pub use fetch_error::FetchError;
pub use storage_error::StorageError;
