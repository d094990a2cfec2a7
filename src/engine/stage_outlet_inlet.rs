// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-graph connector between one stage's outlet and the next stage's inlet.
//!
//! Both halves share a single `ConnectorState`, so the invariants that span the
//! pair (at most one element in flight, monotone finished flags) are enforced
//! in one place. The [`Outlet`] and [`Inlet`] views restrict which half of the
//! contract each stage can reach.
//!
//! Neither a push nor a pull calls the other side's listener directly: each is
//! queued as a signal on the graph's context, which breaks the push/pull
//! recursion between neighbouring stages.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::engine::context::{GraphContext, SignalKind, UnrolledSignal};
use crate::errors::{GraphError, PortError, StreamError};
use crate::observability::messages::port::TeardownListenerFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{InletListener, OutletListener, Port, StageInlet, StageOutlet};

struct ConnectorState<T> {
    inlet_pulled: bool,
    /// Pushed but `on_push` not yet invoked. Moved to `current_element` when
    /// the push signal is delivered.
    pushed_element: Option<T>,
    /// Announced to the inlet through `on_push`, waiting for `grab`.
    current_element: Option<T>,
    outlet_finished: bool,
    inlet_finished: bool,
    /// Failure to surface once the in-flight element has been delivered.
    failure: Option<StreamError>,
}

/// A port connecting two stages of the same graph.
pub struct StageOutletInlet<T> {
    context: Rc<GraphContext>,
    state: RefCell<ConnectorState<T>>,
    inlet_listener: RefCell<Option<Weak<dyn InletListener>>>,
    outlet_listener: RefCell<Option<Weak<dyn OutletListener>>>,
}

impl<T: 'static> StageOutletInlet<T> {
    pub(crate) fn new(context: Rc<GraphContext>) -> Rc<Self> {
        Rc::new(Self {
            context,
            state: RefCell::new(ConnectorState {
                inlet_pulled: false,
                pushed_element: None,
                current_element: None,
                outlet_finished: false,
                inlet_finished: false,
                failure: None,
            }),
            inlet_listener: RefCell::new(None),
            outlet_listener: RefCell::new(None),
        })
    }

    /// The producing half, for the upstream stage.
    pub fn outlet(self: &Rc<Self>) -> Outlet<T> {
        Outlet { port: self.clone() }
    }

    /// The consuming half, for the downstream stage.
    pub fn inlet(self: &Rc<Self>) -> Inlet<T> {
        Inlet { port: self.clone() }
    }

    fn inlet_listener(&self) -> Result<Rc<dyn InletListener>, PortError> {
        self.inlet_listener
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(PortError::ListenerGone { side: "inlet" })
    }

    fn outlet_listener(&self) -> Result<Rc<dyn OutletListener>, PortError> {
        self.outlet_listener
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(PortError::ListenerGone { side: "outlet" })
    }

    fn deliver_push(&self) -> Result<(), StreamError> {
        let delivered = {
            let mut state = self.state.borrow_mut();
            if state.inlet_finished {
                return Ok(());
            }
            match state.pushed_element.take() {
                Some(element) => {
                    state.current_element = Some(element);
                    true
                }
                None => false,
            }
        };
        if delivered {
            self.inlet_listener()?.on_push()?;
        }
        self.finish_deferred()
    }

    fn deliver_pull(&self) -> Result<(), StreamError> {
        let wanted = {
            let state = self.state.borrow();
            state.inlet_pulled
                && !state.outlet_finished
                && state.pushed_element.is_none()
                && state.current_element.is_none()
        };
        if wanted {
            self.outlet_listener()?.on_pull()?;
        }
        Ok(())
    }

    /// Surface a completion or failure that was held back while an element was
    /// in flight.
    fn finish_deferred(&self) -> Result<(), StreamError> {
        let failure = {
            let mut state = self.state.borrow_mut();
            // The inlet may have cancelled, or a new push may be waiting, by the
            // time the delivered element's on_push returned.
            if !state.outlet_finished || state.inlet_finished || state.pushed_element.is_some() {
                return Ok(());
            }
            state.inlet_finished = true;
            state.failure.take()
        };
        let listener = self.inlet_listener()?;
        match failure {
            Some(error) => listener.on_upstream_failure(error),
            None => listener.on_upstream_finish(),
        }
    }

    fn finish_outlet(self: &Rc<Self>, failure: Option<StreamError>) -> Result<(), StreamError> {
        let notify = {
            let mut state = self.state.borrow_mut();
            if state.outlet_finished {
                return Err(PortError::CompleteTwice.into());
            }
            state.outlet_finished = true;
            state.inlet_pulled = false;
            if state.inlet_finished {
                None
            } else if state.pushed_element.is_none() && state.current_element.is_none() {
                state.inlet_finished = true;
                Some(failure)
            } else {
                state.failure = failure;
                if state.pushed_element.is_none() {
                    // Delivered but not grabbed yet: no push signal is queued to
                    // carry the finish, so queue one.
                    self.context.enqueue_signal(self.clone(), SignalKind::Push);
                }
                None
            }
        };
        match notify {
            Some(None) => self.inlet_listener()?.on_upstream_finish(),
            Some(Some(error)) => self.inlet_listener()?.on_upstream_failure(error),
            None => Ok(()),
        }
    }
}

impl<T: 'static> UnrolledSignal for StageOutletInlet<T> {
    fn signal(&self, kind: SignalKind) -> Result<(), StreamError> {
        match kind {
            SignalKind::Push => self.deliver_push(),
            SignalKind::Pull => self.deliver_pull(),
        }
    }
}

impl<T: 'static> Port for StageOutletInlet<T> {
    fn on_stream_failure(&self, reason: &StreamError) {
        let (notify_outlet, notify_inlet) = {
            let mut state = self.state.borrow_mut();
            let notify_outlet = !state.outlet_finished;
            let notify_inlet = !state.inlet_finished;
            state.outlet_finished = true;
            state.inlet_finished = true;
            state.inlet_pulled = false;
            state.pushed_element = None;
            state.failure = None;
            (notify_outlet, notify_inlet)
        };
        if notify_outlet {
            if let Ok(listener) = self.outlet_listener() {
                if let Err(error) = listener.on_downstream_finish() {
                    TeardownListenerFailed {
                        callback: "on_downstream_finish",
                        error: &error,
                    }
                    .log();
                }
            }
        }
        if notify_inlet {
            if let Ok(listener) = self.inlet_listener() {
                if let Err(error) = listener.on_upstream_failure(reason.clone()) {
                    TeardownListenerFailed {
                        callback: "on_upstream_failure",
                        error: &error,
                    }
                    .log();
                }
            }
        }
    }

    fn verify_ready(&self) -> Result<(), GraphError> {
        if self.inlet_listener().is_err() {
            return Err(GraphError::ListenerNotSet { side: "inlet" });
        }
        if self.outlet_listener().is_err() {
            return Err(GraphError::ListenerNotSet { side: "outlet" });
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        let state = self.state.borrow();
        state.inlet_finished && state.outlet_finished
    }
}

/// Producing view of a [`StageOutletInlet`].
pub struct Outlet<T> {
    port: Rc<StageOutletInlet<T>>,
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
        }
    }
}

impl<T: 'static> StageOutlet<T> for Outlet<T> {
    fn push(&self, element: T) -> Result<(), PortError> {
        {
            let mut state = self.port.state.borrow_mut();
            if state.outlet_finished {
                return Err(PortError::PushAfterComplete);
            }
            if !state.inlet_pulled
                || state.current_element.is_some()
                || state.pushed_element.is_some()
            {
                return Err(PortError::PushWithoutPull);
            }
            state.pushed_element = Some(element);
        }
        self.port
            .context
            .enqueue_signal(self.port.clone(), SignalKind::Push);
        Ok(())
    }

    fn is_available(&self) -> bool {
        let state = self.port.state.borrow();
        !state.outlet_finished
            && state.inlet_pulled
            && state.pushed_element.is_none()
            && state.current_element.is_none()
    }

    fn is_closed(&self) -> bool {
        self.port.state.borrow().outlet_finished
    }

    fn complete(&self) -> Result<(), StreamError> {
        self.port.finish_outlet(None)
    }

    fn fail(&self, error: StreamError) -> Result<(), StreamError> {
        self.port.finish_outlet(Some(error))
    }

    fn set_listener(&self, listener: Weak<dyn OutletListener>) {
        *self.port.outlet_listener.borrow_mut() = Some(listener);
    }
}

/// Consuming view of a [`StageOutletInlet`].
pub struct Inlet<T> {
    port: Rc<StageOutletInlet<T>>,
}

impl<T> Clone for Inlet<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
        }
    }
}

impl<T: 'static> StageInlet<T> for Inlet<T> {
    fn pull(&self) -> Result<(), PortError> {
        {
            let mut state = self.port.state.borrow_mut();
            if state.inlet_finished {
                return Err(PortError::PullAfterComplete);
            } else if state.inlet_pulled {
                return Err(PortError::PullTwice);
            } else if state.current_element.is_some() {
                return Err(PortError::PullWithoutGrab);
            }
            if state.outlet_finished {
                // The finish notice is already on its way.
                return Ok(());
            }
            state.inlet_pulled = true;
        }
        self.port
            .context
            .enqueue_signal(self.port.clone(), SignalKind::Pull);
        Ok(())
    }

    fn is_pulled(&self) -> bool {
        self.port.state.borrow().inlet_pulled
    }

    fn is_available(&self) -> bool {
        self.port.state.borrow().current_element.is_some()
    }

    fn is_closed(&self) -> bool {
        self.port.state.borrow().inlet_finished
    }

    fn cancel(&self) -> Result<(), StreamError> {
        let notify = {
            let mut state = self.port.state.borrow_mut();
            if state.inlet_finished {
                return Err(PortError::CancelTwice.into());
            }
            state.inlet_finished = true;
            state.inlet_pulled = false;
            state.current_element = None;
            state.pushed_element = None;
            state.failure = None;
            !std::mem::replace(&mut state.outlet_finished, true)
        };
        if notify {
            self.port.outlet_listener()?.on_downstream_finish()?;
        }
        Ok(())
    }

    fn grab(&self) -> Result<T, PortError> {
        let mut state = self.port.state.borrow_mut();
        let element = state
            .current_element
            .take()
            .ok_or(PortError::GrabWithoutPush)?;
        state.inlet_pulled = false;
        Ok(element)
    }

    fn set_listener(&self, listener: Weak<dyn InletListener>) {
        *self.port.inlet_listener.borrow_mut() = Some(listener);
    }
}
