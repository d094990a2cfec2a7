// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Graph startup after port verification
//! * Whole-graph failure and teardown
//! * Graph termination once every port finished

use crate::errors::StreamError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Graph verified all ports and is starting its stages.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use reactive_stages::observability::messages::graph::GraphStarted;
///
/// let msg = GraphStarted {
///     port_count: 4,
///     stage_count: 3,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct GraphStarted {
    pub port_count: usize,
    pub stage_count: usize,
}

impl Display for GraphStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting graph: {} ports, {} stages",
            self.port_count, self.stage_count
        )
    }
}

impl StructuredLog for GraphStarted {
    fn log(&self) {
        tracing::info!(
            port_count = self.port_count,
            stage_count = self.stage_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph",
            span_name = name,
            port_count = self.port_count,
            stage_count = self.stage_count,
        )
    }
}

/// A fault escalated to a whole-graph failure; every port is being torn down.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use reactive_stages::errors::StreamError;
/// use reactive_stages::observability::messages::graph::GraphFailed;
///
/// let reason = StreamError::failed("boom");
/// let msg = GraphFailed {
///     reason: &reason,
///     port_count: 2,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct GraphFailed<'a> {
    pub reason: &'a StreamError,
    pub port_count: usize,
}

impl Display for GraphFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph failed, tearing down {} ports: {}",
            self.port_count, self.reason
        )
    }
}

impl StructuredLog for GraphFailed<'_> {
    fn log(&self) {
        tracing::error!(
            reason = %self.reason,
            port_count = self.port_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "graph_failed",
            span_name = name,
            reason = %self.reason,
            port_count = self.port_count,
        )
    }
}

/// A second fault arrived after the graph had already failed.
///
/// # Log Level
/// `debug!` - The graph is already torn down
pub struct FailureAfterTeardown<'a> {
    pub reason: &'a StreamError,
}

impl Display for FailureAfterTeardown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Ignoring failure after graph teardown: {}", self.reason)
    }
}

impl StructuredLog for FailureAfterTeardown<'_> {
    fn log(&self) {
        tracing::debug!(reason = %self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("failure_after_teardown", span_name = name, reason = %self.reason)
    }
}

/// Every port of the graph reached a terminal state.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphTerminated {
    pub port_count: usize,
    pub failed: bool,
}

impl Display for GraphTerminated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.failed {
            write!(f, "Graph terminated after failure: {} ports finished", self.port_count)
        } else {
            write!(f, "Graph terminated: {} ports finished", self.port_count)
        }
    }
}

impl StructuredLog for GraphTerminated {
    fn log(&self) {
        tracing::info!(
            port_count = self.port_count,
            failed = self.failed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_terminated",
            span_name = name,
            port_count = self.port_count,
            failed = self.failed,
        )
    }
}
