// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::PortError;
use std::sync::Arc;

/// Terminal failure carried through a graph.
///
/// Cloneable so a single whole-graph failure can be handed to every port.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// A stage failed its outlet explicitly.
    #[error("stream failed: {message}")]
    Failed { message: String },

    /// An upstream publisher signalled an element nobody requested.
    #[error("element signalled without demand for it")]
    ElementWithoutDemand,

    /// A stage misused a port while handling a signal.
    #[error(transparent)]
    Usage(#[from] PortError),

    /// An upstream publisher signalled `on_error`.
    #[error("upstream publisher failed: {0}")]
    Publisher(Arc<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    pub fn failed(message: impl Into<String>) -> Self {
        StreamError::Failed {
            message: message.into(),
        }
    }

    pub fn publisher<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StreamError::Publisher(Arc::new(error))
    }
}
