/*!
 * Core Module
 * Synchronization primitives, configuration and error handling
 */

pub mod bincode;
pub mod config;
pub mod errors;
pub mod sync;

// Re-export for convenience
pub use config::SyncConfig;
pub use errors::*;
