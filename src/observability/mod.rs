// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and call tracing.
//!
//! Message types follow a struct-based pattern with `Display` so log text lives
//! in one place instead of being scattered through the engine as magic strings.
//!
//! * `messages::graph` - graph lifecycle events
//! * `messages::port` - per-port protocol events
//! * `probes` - pass-through wrappers that trace every Reactive Streams call
//!
//! # Usage
//!
//! ```rust
//! use reactive_stages::observability::messages::port::DuplicateSubscription;
//!
//! let msg = DuplicateSubscription { port: 2 };
//! tracing::warn!("{}", msg);
//! ```

use tracing_subscriber::EnvFilter;

pub mod messages;
pub mod probes;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
