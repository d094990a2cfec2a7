// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-port protocol events.
//!
//! Ports are identified by the index the graph assigned them at registration.

use crate::errors::StreamError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A subscriber inlet asked its upstream publisher for more elements.
///
/// # Log Level
/// `trace!` - Emitted once per batched request
///
/// # Example
/// ```
/// use reactive_stages::observability::messages::port::DemandRequested;
///
/// let msg = DemandRequested {
///     port: 0,
///     requested: 5,
///     buffered: 5,
/// };
///
/// tracing::trace!("{}", msg);
/// ```
pub struct DemandRequested {
    pub port: usize,
    pub requested: usize,
    pub buffered: usize,
}

impl Display for DemandRequested {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Port {} requested {} elements with {} in flight or buffered",
            self.port, self.requested, self.buffered
        )
    }
}

impl StructuredLog for DemandRequested {
    fn log(&self) {
        tracing::trace!(
            port = self.port,
            requested = self.requested,
            buffered = self.buffered,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "demand_requested",
            span_name = name,
            port = self.port,
            requested = self.requested,
        )
    }
}

/// An upstream publisher offered a second subscription, or one after finish.
///
/// # Log Level
/// `warn!` - Misbehaving upstream, the subscription is cancelled
pub struct DuplicateSubscription {
    pub port: usize,
}

impl Display for DuplicateSubscription {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Port {} cancelled a duplicate or late subscription", self.port)
    }
}

impl StructuredLog for DuplicateSubscription {
    fn log(&self) {
        tracing::warn!(port = self.port, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("duplicate_subscription", span_name = name, port = self.port)
    }
}

/// An upstream publisher broke the Reactive Streams protocol.
///
/// # Log Level
/// `error!` - The port fails its downstream
///
/// # Example
/// ```
/// use reactive_stages::errors::StreamError;
/// use reactive_stages::observability::messages::port::ProtocolViolation;
///
/// let reason = StreamError::ElementWithoutDemand;
/// let msg = ProtocolViolation {
///     port: 1,
///     reason: &reason,
/// };
///
/// assert!(msg.to_string().contains("without demand"));
/// ```
pub struct ProtocolViolation<'a> {
    pub port: usize,
    pub reason: &'a StreamError,
}

impl Display for ProtocolViolation<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Port {} received a protocol violation from upstream: {}",
            self.port, self.reason
        )
    }
}

impl StructuredLog for ProtocolViolation<'_> {
    fn log(&self) {
        tracing::error!(port = self.port, reason = %self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "protocol_violation",
            span_name = name,
            port = self.port,
            reason = %self.reason,
        )
    }
}

/// A listener returned an error while its port was being torn down.
///
/// # Log Level
/// `warn!` - The port is finished regardless
pub struct TeardownListenerFailed<'a> {
    pub callback: &'a str,
    pub error: &'a StreamError,
}

impl Display for TeardownListenerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Listener {} failed during teardown: {}",
            self.callback, self.error
        )
    }
}

impl StructuredLog for TeardownListenerFailed<'_> {
    fn log(&self) {
        tracing::warn!(callback = self.callback, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "teardown_listener_failed",
            span_name = name,
            callback = self.callback,
        )
    }
}
