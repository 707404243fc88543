//! Environment-based runtime configuration.
//!
//! ## `GOSHAWK_STACK_SIZE`
//!
//! Stack size for request-handling coroutines, in decimal (`16384`) or hex
//! (`0x4000`). Default: 16 KB. Total virtual memory is
//! `stack_size x concurrent_coroutines`; raise it for handlers with deep
//! call chains, lower it for very high concurrency.

use std::env;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 16 KB / 0x4000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("GOSHAWK_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(0x4000)
                } else {
                    val.parse().unwrap_or(0x4000)
                }
            }
            Err(_) => 0x4000,
        };
        RuntimeConfig { stack_size }
    }
}
