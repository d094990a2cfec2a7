// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Assembly and driving of one graph.
//!
//! A [`BuiltGraph`] owns the graph's execution context, every port and every
//! stage. It is not `Send`: the whole graph is driven from the thread that
//! built it, while publishers on other threads reach it only through the
//! wakeup channel.

use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::BufferConfig;
use crate::engine::context::{GraphContext, PortId};
use crate::engine::stage_outlet_inlet::{Inlet, Outlet, StageOutletInlet};
use crate::engine::subscriber_inlet::{InletSubscriber, SubscriberInlet};
use crate::errors::GraphError;
use crate::observability::messages::graph::{GraphStarted, GraphTerminated};
use crate::observability::messages::StructuredLog;
use crate::traits::{GraphStage, Port};

pub struct BuiltGraph {
    context: Rc<GraphContext>,
    ports: Vec<Rc<dyn Port>>,
    stages: Vec<Rc<dyn GraphStage>>,
    wakeups: mpsc::UnboundedReceiver<PortId>,
    started: bool,
}

impl Default for BuiltGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltGraph {
    pub fn new() -> Self {
        let (tx, wakeups) = mpsc::unbounded_channel();
        Self {
            context: GraphContext::new(tx),
            ports: Vec::new(),
            stages: Vec::new(),
            wakeups,
            started: false,
        }
    }

    pub fn context(&self) -> &Rc<GraphContext> {
        &self.context
    }

    /// Create a port connecting two stages of this graph.
    pub fn stage_outlet_inlet<T: 'static>(&mut self) -> (Outlet<T>, Inlet<T>) {
        let port = StageOutletInlet::new(self.context.clone());
        let as_port: Rc<dyn Port> = port.clone();
        self.context.register_port(Rc::downgrade(&as_port));
        self.ports.push(as_port);
        (port.outlet(), port.inlet())
    }

    /// Create an inlet fed by an external publisher.
    ///
    /// The returned [`InletSubscriber`] is what gets subscribed to the
    /// publisher; it may be moved to any thread.
    pub fn subscriber_inlet<T: 'static>(
        &mut self,
        buffer: BufferConfig,
    ) -> Result<(Rc<SubscriberInlet<T>>, InletSubscriber<T>), GraphError> {
        let (inlet, subscriber) = SubscriberInlet::new(self.context.clone(), buffer)?;
        self.ports.push(inlet.clone());
        Ok((inlet, subscriber))
    }

    pub fn add_stage(&mut self, stage: Rc<dyn GraphStage>) {
        self.stages.push(stage);
    }

    /// Verify every port and run each stage's `post_start` inside the context.
    pub fn start(&mut self) -> Result<(), GraphError> {
        if self.started {
            return Err(GraphError::AlreadyStarted);
        }
        for port in &self.ports {
            port.verify_ready()?;
        }
        self.started = true;

        let started = GraphStarted {
            port_count: self.ports.len(),
            stage_count: self.stages.len(),
        };
        let span = started.span("start");
        let _guard = span.enter();
        started.log();

        let stages = self.stages.clone();
        self.context.execute(move || {
            for stage in stages {
                stage.post_start()?;
            }
            Ok(())
        });
        self.outcome()
    }

    /// Process every publisher signal that has already arrived, without waiting.
    pub fn run_until_idle(&mut self) -> Result<(), GraphError> {
        if !self.started {
            self.start()?;
        }
        while let Ok(port) = self.wakeups.try_recv() {
            self.context.dispatch_external(port);
        }
        self.outcome()
    }

    /// Drive the graph until every port has finished.
    pub async fn run(&mut self) -> Result<(), GraphError> {
        let span = GraphStarted {
            port_count: self.ports.len(),
            stage_count: self.stages.len(),
        }
        .span("run");
        self.drive().instrument(span).await
    }

    async fn drive(&mut self) -> Result<(), GraphError> {
        self.run_until_idle()?;
        while !self.context.is_terminated() {
            match self.wakeups.recv().await {
                Some(port) => self.context.dispatch_external(port),
                None => break,
            }
        }

        let failure = self.context.failure();
        GraphTerminated {
            port_count: self.ports.len(),
            failed: failure.is_some(),
        }
        .log();
        match failure {
            Some(error) => Err(GraphError::StreamFailed(error)),
            None => Ok(()),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.context.is_terminated()
    }

    fn outcome(&self) -> Result<(), GraphError> {
        match self.context.failure() {
            Some(error) => Err(GraphError::StreamFailed(error)),
            None => Ok(()),
        }
    }
}
