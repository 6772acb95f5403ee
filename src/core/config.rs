/*!
 * Synchronization Configuration
 *
 * Runtime configuration for wait-list node storage
 */

use std::sync::OnceLock;

/// Environment variable that disables node pooling when set to `1`/`true`
pub const AVOID_MEM_POOLS_ENV: &str = "FASTSYNC_AVOID_MEM_POOLS";

/// Environment variable overriding the number of preallocated wait-list nodes
pub const PREALLOCATE_NODES_ENV: &str = "FASTSYNC_PREALLOCATE_NODES";

static GLOBAL: OnceLock<SyncConfig> = OnceLock::new();

/// Wait-list storage configuration
///
/// Pooling keeps freed nodes around for reuse, trading retained memory for
/// fewer allocations under high churn. Disabling it releases node storage
/// each time a list drains. Observable behavior is the same either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Keep freed nodes for reuse
    pub node_pooling: bool,
    /// Node slots reserved when a list is created
    pub preallocate_nodes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_pooling: true,
            preallocate_nodes: 0,
        }
    }
}

impl SyncConfig {
    /// Configuration for primitives that rarely see contention
    pub const fn low_churn() -> Self {
        Self {
            node_pooling: false,
            preallocate_nodes: 0,
        }
    }

    /// Configuration for queues and locks with many waiters coming and going
    pub const fn high_churn() -> Self {
        Self {
            node_pooling: true,
            preallocate_nodes: 64,
        }
    }

    /// Build a configuration from the process environment
    ///
    /// Environment variables:
    /// - FASTSYNC_AVOID_MEM_POOLS: disable node pooling (default: false)
    /// - FASTSYNC_PREALLOCATE_NODES: initial node slots per list (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let avoid_pools = std::env::var(AVOID_MEM_POOLS_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let preallocate_nodes = match std::env::var(PREALLOCATE_NODES_ENV) {
            Ok(raw) => match raw.trim().parse() {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Ignoring invalid {}", PREALLOCATE_NODES_ENV);
                    defaults.preallocate_nodes
                }
            },
            Err(_) => defaults.preallocate_nodes,
        };

        Self {
            node_pooling: !avoid_pools,
            preallocate_nodes,
        }
    }

    /// Process-wide configuration, read from the environment on first use
    pub fn global() -> &'static SyncConfig {
        GLOBAL.get_or_init(Self::from_env)
    }
}
