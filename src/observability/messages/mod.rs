// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! `StructuredLog` to emit itself with its fields attached as tracing fields.
//!
//! # Organization
//!
//! * `graph` - graph lifecycle events (start, whole-graph failure, termination)
//! * `port` - per-port protocol events (demand, violations, teardown)
//!
//! # Usage Pattern
//!
//! ```rust
//! use reactive_stages::observability::messages::graph::GraphStarted;
//! use reactive_stages::observability::messages::StructuredLog;
//!
//! let msg = GraphStarted {
//!     port_count: 3,
//!     stage_count: 2,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod graph;
pub mod port;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its documented level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
