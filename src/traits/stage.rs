// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Authoring contracts for graph stages.
//!
//! A stage owns the inlet and outlet views of the ports it is wired to and
//! registers itself as their listener. Listeners are held weakly by the ports;
//! the graph keeps the stages alive.

use std::rc::Weak;

use crate::errors::{PortError, StreamError};

/// A unit of processing whose hook runs once all its ports are verified.
pub trait GraphStage {
    /// Invoked once, inside the graph's context, after every port of the graph
    /// reported ready.
    fn post_start(&self) -> Result<(), StreamError>;
}

/// Callbacks a stage receives for one of its inlets.
pub trait InletListener {
    /// An element is available to `grab`.
    fn on_push(&self) -> Result<(), StreamError>;

    fn on_upstream_finish(&self) -> Result<(), StreamError>;

    fn on_upstream_failure(&self, error: StreamError) -> Result<(), StreamError>;
}

/// Callbacks a stage receives for one of its outlets.
pub trait OutletListener {
    /// Downstream wants exactly one more element.
    fn on_pull(&self) -> Result<(), StreamError>;

    fn on_downstream_finish(&self) -> Result<(), StreamError>;
}

/// The consuming end of a port, as seen by the stage that owns it.
pub trait StageInlet<T> {
    /// Request one element. Delivery is announced through `on_push`.
    fn pull(&self) -> Result<(), PortError>;

    fn is_pulled(&self) -> bool;

    fn is_available(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Stop consuming. Upstream is notified unless it already finished.
    fn cancel(&self) -> Result<(), StreamError>;

    /// Take the element announced by the last `on_push`.
    fn grab(&self) -> Result<T, PortError>;

    fn set_listener(&self, listener: Weak<dyn InletListener>);
}

/// The producing end of a port, as seen by the stage that owns it.
pub trait StageOutlet<T> {
    /// Hand exactly one element to downstream in answer to one `on_pull`.
    fn push(&self, element: T) -> Result<(), PortError>;

    /// Whether a `push` would currently be accepted.
    fn is_available(&self) -> bool;

    fn is_closed(&self) -> bool;

    fn complete(&self) -> Result<(), StreamError>;

    fn fail(&self, error: StreamError) -> Result<(), StreamError>;

    fn set_listener(&self, listener: Weak<dyn OutletListener>);
}

impl<T, I: StageInlet<T> + ?Sized> StageInlet<T> for std::rc::Rc<I> {
    fn pull(&self) -> Result<(), PortError> {
        (**self).pull()
    }

    fn is_pulled(&self) -> bool {
        (**self).is_pulled()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn cancel(&self) -> Result<(), StreamError> {
        (**self).cancel()
    }

    fn grab(&self) -> Result<T, PortError> {
        (**self).grab()
    }

    fn set_listener(&self, listener: Weak<dyn InletListener>) {
        (**self).set_listener(listener)
    }
}
