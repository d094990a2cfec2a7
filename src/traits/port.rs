// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{GraphError, StreamError};

/// Lifecycle shared by every connection point registered with a graph.
///
/// Only the graph's execution context calls these methods.
pub trait Port {
    /// Tear this port down because some other part of the graph failed.
    ///
    /// Listeners that have not finished yet are notified once; ports that are
    /// already finished ignore the call.
    fn on_stream_failure(&self, reason: &StreamError);

    /// Verify every listener is registered before the graph starts.
    fn verify_ready(&self) -> Result<(), GraphError>;

    /// Whether both sides of the port reached a terminal state.
    fn is_finished(&self) -> bool;

    /// Handle one event marshaled from outside the graph's context.
    fn process_external(&self) -> Result<(), StreamError> {
        Ok(())
    }
}
