// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The single logical execution context shared by every port of a graph.
//!
//! All port and stage state of one graph is only ever touched from inside
//! [`GraphContext::execute`]. Work that would otherwise recurse (a push handing
//! an element to the next stage, a pull asking the previous one for more) is
//! queued as a signal instead and run by an iterative drain loop, so stack
//! depth stays constant no matter how long the graph or the stream is.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tokio::sync::mpsc;

use crate::errors::StreamError;
use crate::observability::messages::graph::{FailureAfterTeardown, GraphFailed};
use crate::observability::messages::StructuredLog;
use crate::traits::Port;

/// Index of a port within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(usize);

impl PortId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port-{}", self.0)
    }
}

/// What a queued signal asks its target to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    /// Deliver a pushed element (or a deferred finish) to the inlet side.
    Push,
    /// Deliver a pull to the outlet side.
    Pull,
}

/// A port that can be the target of a queued signal.
pub(crate) trait UnrolledSignal {
    fn signal(&self, kind: SignalKind) -> Result<(), StreamError>;
}

type Task = Box<dyn FnOnce() -> Result<(), StreamError>>;

enum Work {
    Signal(Rc<dyn UnrolledSignal>, SignalKind),
    Task(Task),
}

/// Execution context of one graph.
pub struct GraphContext {
    work: RefCell<VecDeque<Work>>,
    ports: RefCell<Vec<Weak<dyn Port>>>,
    draining: Cell<bool>,
    failure: RefCell<Option<StreamError>>,
    wakeups: mpsc::UnboundedSender<PortId>,
}

impl GraphContext {
    pub(crate) fn new(wakeups: mpsc::UnboundedSender<PortId>) -> Rc<Self> {
        Rc::new(Self {
            work: RefCell::new(VecDeque::new()),
            ports: RefCell::new(Vec::new()),
            draining: Cell::new(false),
            failure: RefCell::new(None),
            wakeups,
        })
    }

    pub(crate) fn register_port(&self, port: Weak<dyn Port>) -> PortId {
        let mut ports = self.ports.borrow_mut();
        ports.push(port);
        PortId(ports.len() - 1)
    }

    pub(crate) fn wakeup_sender(&self) -> mpsc::UnboundedSender<PortId> {
        self.wakeups.clone()
    }

    pub(crate) fn enqueue_signal(&self, target: Rc<dyn UnrolledSignal>, kind: SignalKind) {
        self.work.borrow_mut().push_back(Work::Signal(target, kind));
    }

    /// Run `task` with exclusive access to the graph's state.
    ///
    /// If the context is idle the task runs now and the signal queue is then
    /// drained to exhaustion. If the drain loop is already running the task is
    /// queued and runs after every signal queued before it.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() -> Result<(), StreamError> + 'static,
    {
        if self.draining.get() {
            self.work.borrow_mut().push_back(Work::Task(Box::new(task)));
            return;
        }

        let _draining = DrainGuard::enter(&self.draining);
        if let Err(error) = task() {
            self.fail_stream(error);
        }
        self.drain();
    }

    pub(crate) fn dispatch_external(&self, id: PortId) {
        let port = self.ports.borrow().get(id.0).and_then(Weak::upgrade);
        if let Some(port) = port {
            self.execute(move || port.process_external());
        }
    }

    fn drain(&self) {
        loop {
            let next = self.work.borrow_mut().pop_front();
            let Some(work) = next else {
                break;
            };
            let result = match work {
                Work::Signal(target, kind) => target.signal(kind),
                Work::Task(task) => task(),
            };
            if let Err(error) = result {
                self.fail_stream(error);
            }
        }
    }

    /// Tear down every port of the graph because of `reason`.
    ///
    /// Only the first failure is acted on; later ones are logged and dropped.
    pub fn fail_stream(&self, reason: StreamError) {
        if self.failure.borrow().is_some() {
            FailureAfterTeardown { reason: &reason }.log();
            return;
        }
        *self.failure.borrow_mut() = Some(reason.clone());

        let ports: Vec<Rc<dyn Port>> = self
            .ports
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        GraphFailed {
            reason: &reason,
            port_count: ports.len(),
        }
        .log();
        for port in ports {
            port.on_stream_failure(&reason);
        }
    }

    /// The failure that tore the graph down, if any.
    pub fn failure(&self) -> Option<StreamError> {
        self.failure.borrow().clone()
    }

    pub fn port_count(&self) -> usize {
        self.ports.borrow().len()
    }

    /// Whether every live port of the graph has finished.
    pub fn is_terminated(&self) -> bool {
        self.ports
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .all(|port| port.is_finished())
    }
}

struct DrainGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
