// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::StreamError;

/// Errors raised while assembling, starting or running a graph.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// A port reached start without one of its listeners registered.
    #[error("cannot start stream without {side} listener set")]
    ListenerNotSet { side: &'static str },

    #[error("invalid buffer configuration: {0}")]
    InvalidBuffer(String),

    #[error("graph has already been started")]
    AlreadyStarted,

    /// The graph was torn down by a whole-graph failure.
    #[error("graph terminated by stream failure: {0}")]
    StreamFailed(StreamError),
}
