// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Adapter that feeds an external Reactive Streams publisher into a graph.
//!
//! Publisher signals may arrive on any thread. [`InletSubscriber`] is the
//! thread-safe face handed to the publisher: it only forwards each signal over
//! a channel and wakes the graph. The [`SubscriberInlet`] itself lives inside
//! the graph and handles the forwarded signals one at a time from the graph's
//! context, so its state is never touched concurrently.
//!
//! Demand is requested in batches: the inlet keeps `outstanding demand +
//! buffered elements` at or below the high watermark and tops it back up once
//! it falls to the low watermark.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::BufferConfig;
use crate::engine::context::{GraphContext, PortId, SignalKind, UnrolledSignal};
use crate::errors::{GraphError, PortError, StreamError};
use crate::observability::messages::port::{
    DemandRequested, DuplicateSubscription, ProtocolViolation, TeardownListenerFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{InletListener, Port, StageInlet, Subscriber, Subscription};

/// A publisher signal on its way into the graph's context.
pub(crate) enum InletEvent<T> {
    Subscribe(Arc<dyn Subscription>),
    Next(T),
    Error(StreamError),
    Complete,
}

struct InletState<T> {
    elements: VecDeque<T>,
    /// Announced through `on_push`, waiting for `grab`.
    element_to_push: Option<T>,
    subscription: Option<Arc<dyn Subscription>>,
    outstanding_demand: usize,
    pulled: bool,
    upstream_finished: bool,
    downstream_finished: bool,
    /// Upstream failure held back until the buffer has drained.
    error: Option<StreamError>,
}

/// Graph-side half of a publisher connection, consumed by one stage.
pub struct SubscriberInlet<T> {
    me: Weak<Self>,
    id: PortId,
    context: Rc<GraphContext>,
    buffer: BufferConfig,
    state: RefCell<InletState<T>>,
    events: RefCell<mpsc::UnboundedReceiver<InletEvent<T>>>,
    listener: RefCell<Option<Weak<dyn InletListener>>>,
}

impl<T: 'static> SubscriberInlet<T> {
    /// Create the inlet, register it with `context` and return the handle to
    /// subscribe to a publisher with.
    pub(crate) fn new(
        context: Rc<GraphContext>,
        buffer: BufferConfig,
    ) -> Result<(Rc<Self>, InletSubscriber<T>), GraphError> {
        buffer
            .validate()
            .map_err(|e| GraphError::InvalidBuffer(e.to_string()))?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inlet = Rc::new_cyclic(|me: &Weak<Self>| {
            let port: Weak<dyn Port> = me.clone();
            let id = context.register_port(port);
            Self {
                me: me.clone(),
                id,
                context: context.clone(),
                buffer,
                state: RefCell::new(InletState {
                    elements: VecDeque::with_capacity(buffer.high_watermark),
                    element_to_push: None,
                    subscription: None,
                    outstanding_demand: 0,
                    pulled: false,
                    upstream_finished: false,
                    downstream_finished: false,
                    error: None,
                }),
                events: RefCell::new(events_rx),
                listener: RefCell::new(None),
            }
        });
        let subscriber = InletSubscriber {
            port: inlet.id,
            events: events_tx,
            wakeups: context.wakeup_sender(),
        };
        Ok((inlet, subscriber))
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    fn listener(&self) -> Result<Rc<dyn InletListener>, PortError> {
        self.listener
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(PortError::ListenerGone { side: "inlet" })
    }

    fn schedule(&self) {
        if let Some(me) = self.me.upgrade() {
            self.context.enqueue_signal(me, SignalKind::Push);
        }
    }

    fn handle(&self, event: InletEvent<T>) -> Result<(), StreamError> {
        match event {
            InletEvent::Subscribe(subscription) => {
                self.handle_subscribe(subscription);
                Ok(())
            }
            InletEvent::Next(element) => {
                self.handle_next(element);
                Ok(())
            }
            InletEvent::Error(error) => self.handle_finish(Some(error)),
            InletEvent::Complete => self.handle_finish(None),
        }
    }

    fn handle_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let accepted = {
            let mut state = self.state.borrow_mut();
            if state.upstream_finished || state.downstream_finished || state.subscription.is_some() {
                false
            } else {
                state.subscription = Some(subscription.clone());
                true
            }
        };
        if !accepted {
            DuplicateSubscription {
                port: self.id.index(),
            }
            .log();
            subscription.cancel();
            return;
        }
        self.maybe_request();
    }

    /// Top outstanding demand back up to the high watermark once demand plus
    /// buffered elements fell to the low watermark.
    fn maybe_request(&self) {
        let (subscription, requested, buffered) = {
            let mut state = self.state.borrow_mut();
            if state.upstream_finished {
                return;
            }
            let Some(subscription) = state.subscription.clone() else {
                return;
            };
            let buffered = state.outstanding_demand + state.elements.len();
            if buffered > self.buffer.low_watermark {
                return;
            }
            let requested = self.buffer.high_watermark - buffered;
            state.outstanding_demand += requested;
            (subscription, requested, buffered)
        };
        DemandRequested {
            port: self.id.index(),
            requested,
            buffered,
        }
        .log();
        subscription.request(requested as u64);
    }

    fn handle_next(&self, element: T) {
        let signal = {
            let mut state = self.state.borrow_mut();
            if state.upstream_finished || state.downstream_finished {
                return;
            }
            if state.outstanding_demand == 0 {
                None
            } else {
                state.outstanding_demand -= 1;
                state.elements.push_back(element);
                Some(state.pulled && state.element_to_push.is_none())
            }
        };
        match signal {
            Some(true) => self.schedule(),
            Some(false) => {}
            None => {
                let reason = StreamError::ElementWithoutDemand;
                ProtocolViolation {
                    port: self.id.index(),
                    reason: &reason,
                }
                .log();
                self.on_stream_failure(&reason);
            }
        }
    }

    fn handle_finish(&self, error: Option<StreamError>) -> Result<(), StreamError> {
        let finish_now = {
            let mut state = self.state.borrow_mut();
            if state.upstream_finished || state.downstream_finished {
                return Ok(());
            }
            state.subscription = None;
            state.upstream_finished = true;
            if state.elements.is_empty() && state.element_to_push.is_none() {
                state.downstream_finished = true;
                Some(error)
            } else {
                state.error = error;
                None
            }
        };
        match finish_now {
            Some(error) => self.notify_finish(error),
            None => Ok(()),
        }
    }

    fn notify_finish(&self, error: Option<StreamError>) -> Result<(), StreamError> {
        let listener = self.listener()?;
        match error {
            Some(error) => listener.on_upstream_failure(error),
            None => listener.on_upstream_finish(),
        }
    }
}

enum Delivery {
    Push,
    Finish(Option<StreamError>),
    Nothing,
}

impl<T: 'static> UnrolledSignal for SubscriberInlet<T> {
    fn signal(&self, _kind: SignalKind) -> Result<(), StreamError> {
        let delivery = {
            let mut state = self.state.borrow_mut();
            if state.downstream_finished {
                Delivery::Nothing
            } else if state.pulled && state.element_to_push.is_none() && !state.elements.is_empty()
            {
                state.element_to_push = state.elements.pop_front();
                Delivery::Push
            } else if state.upstream_finished
                && state.elements.is_empty()
                && state.element_to_push.is_none()
            {
                state.downstream_finished = true;
                Delivery::Finish(state.error.take())
            } else {
                Delivery::Nothing
            }
        };
        match delivery {
            Delivery::Push => self.listener()?.on_push(),
            Delivery::Finish(error) => self.notify_finish(error),
            Delivery::Nothing => Ok(()),
        }
    }
}

impl<T: 'static> Port for SubscriberInlet<T> {
    fn on_stream_failure(&self, reason: &StreamError) {
        let (subscription, notify) = {
            let mut state = self.state.borrow_mut();
            let notify = !state.downstream_finished;
            state.upstream_finished = true;
            state.downstream_finished = true;
            state.pulled = false;
            state.elements.clear();
            state.element_to_push = None;
            state.error = None;
            (state.subscription.take(), notify)
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        if notify {
            if let Ok(listener) = self.listener() {
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
        match self.listener() {
            Ok(_) => Ok(()),
            Err(_) => Err(GraphError::ListenerNotSet { side: "inlet" }),
        }
    }

    fn is_finished(&self) -> bool {
        let state = self.state.borrow();
        state.upstream_finished && state.downstream_finished
    }

    fn process_external(&self) -> Result<(), StreamError> {
        let event = self.events.borrow_mut().try_recv();
        match event {
            Ok(event) => self.handle(event),
            Err(_) => Ok(()),
        }
    }
}

impl<T: 'static> StageInlet<T> for SubscriberInlet<T> {
    fn pull(&self) -> Result<(), PortError> {
        let signal = {
            let mut state = self.state.borrow_mut();
            if state.downstream_finished {
                return Err(PortError::PullAfterComplete);
            }
            if state.pulled {
                return Err(PortError::PullTwice);
            }
            state.pulled = true;
            !state.elements.is_empty()
        };
        if signal {
            self.schedule();
        }
        Ok(())
    }

    fn is_pulled(&self) -> bool {
        self.state.borrow().pulled
    }

    fn is_available(&self) -> bool {
        self.state.borrow().element_to_push.is_some()
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().downstream_finished
    }

    fn cancel(&self) -> Result<(), StreamError> {
        let subscription = {
            let mut state = self.state.borrow_mut();
            if state.downstream_finished {
                return Err(PortError::CancelTwice.into());
            }
            state.downstream_finished = true;
            state.upstream_finished = true;
            state.pulled = false;
            state.elements.clear();
            state.element_to_push = None;
            state.error = None;
            state.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        Ok(())
    }

    fn grab(&self) -> Result<T, PortError> {
        let (element, finish) = {
            let mut state = self.state.borrow_mut();
            if state.downstream_finished {
                return Err(PortError::GrabWhenFinished);
            }
            if !state.pulled {
                return Err(PortError::GrabWhenNotPulled);
            }
            let element = state
                .element_to_push
                .take()
                .ok_or(PortError::GrabWithoutPush)?;
            state.pulled = false;
            (element, state.upstream_finished && state.elements.is_empty())
        };
        if finish {
            // The finish is delivered from the next signal, not from inside grab.
            self.schedule();
        } else {
            self.maybe_request();
        }
        Ok(element)
    }

    fn set_listener(&self, listener: Weak<dyn InletListener>) {
        *self.listener.borrow_mut() = Some(listener);
    }
}

/// Thread-safe [`Subscriber`] that forwards a publisher's signals into the
/// graph owning the matching [`SubscriberInlet`].
pub struct InletSubscriber<T> {
    port: PortId,
    events: mpsc::UnboundedSender<InletEvent<T>>,
    wakeups: mpsc::UnboundedSender<PortId>,
}

impl<T> Clone for InletSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port,
            events: self.events.clone(),
            wakeups: self.wakeups.clone(),
        }
    }
}

impl<T> InletSubscriber<T> {
    pub fn port(&self) -> PortId {
        self.port
    }

    fn forward(&self, event: InletEvent<T>) {
        match self.events.send(event) {
            Ok(()) => {
                let _ = self.wakeups.send(self.port);
            }
            // The graph is gone; nobody will ever request from this subscription.
            Err(mpsc::error::SendError(InletEvent::Subscribe(subscription))) => {
                subscription.cancel()
            }
            Err(_) => {}
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for InletSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.forward(InletEvent::Subscribe(subscription));
    }

    fn on_next(&self, item: T) {
        self.forward(InletEvent::Next(item));
    }

    fn on_error(&self, error: StreamError) {
        self.forward(InletEvent::Error(error));
    }

    fn on_complete(&self) {
        self.forward(InletEvent::Complete);
    }
}
