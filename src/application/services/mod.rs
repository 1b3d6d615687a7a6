//! Application services.

pub mod cache_manager;
pub mod load_orchestrator;

pub use cache_manager::CacheManager;
pub use load_orchestrator::LoadOrchestrator;
