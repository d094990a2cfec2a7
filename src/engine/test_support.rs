// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stages, listeners and publishers shared by the engine's tests.

use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use tokio::sync::{AcquireError, Semaphore};

use crate::errors::StreamError;
use crate::traits::{
    GraphStage, InletListener, OutletListener, Publisher, StageInlet, StageOutlet, Subscriber,
    Subscription,
};

pub(crate) type Action = Box<dyn Fn() -> Result<(), StreamError>>;

/// Records every listener callback and optionally reacts to `on_push`.
#[derive(Default)]
pub(crate) struct RecordingListener {
    log: RefCell<Vec<String>>,
    pub(crate) on_push: RefCell<Option<Action>>,
}

impl RecordingListener {
    pub(crate) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(event.to_string());
    }
}

impl InletListener for RecordingListener {
    fn on_push(&self) -> Result<(), StreamError> {
        self.record("push");
        if let Some(action) = self.on_push.borrow().as_ref() {
            action()?;
        }
        Ok(())
    }

    fn on_upstream_finish(&self) -> Result<(), StreamError> {
        self.record("upstream finish");
        Ok(())
    }

    fn on_upstream_failure(&self, error: StreamError) -> Result<(), StreamError> {
        self.record(&format!("upstream failure: {}", error));
        Ok(())
    }
}

impl OutletListener for RecordingListener {
    fn on_pull(&self) -> Result<(), StreamError> {
        self.record("pull");
        Ok(())
    }

    fn on_downstream_finish(&self) -> Result<(), StreamError> {
        self.record("downstream finish");
        Ok(())
    }
}

/// A subscription driven by the test: it only records what the graph asks for.
#[derive(Default)]
pub(crate) struct ManualSubscription {
    requests: Mutex<Vec<u64>>,
    cancels: Mutex<usize>,
}

impl ManualSubscription {
    pub(crate) fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn cancels(&self) -> usize {
        *self.cancels.lock().unwrap()
    }
}

impl Subscription for ManualSubscription {
    fn request(&self, n: u64) {
        self.requests.lock().unwrap().push(n);
    }

    fn cancel(&self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Running,
    Completed,
    Failed(String),
}

/// Terminal stage that records every element it grabs.
///
/// With `auto_pull` it pulls on start and after every grab; otherwise the test
/// calls [`CollectStage::pull_next`] from inside the graph's context.
pub(crate) struct CollectStage<T> {
    inlet: Box<dyn StageInlet<T>>,
    auto_pull: bool,
    elements: RefCell<Vec<T>>,
    outcome: RefCell<Outcome>,
}

impl<T: 'static> CollectStage<T> {
    pub(crate) fn new(inlet: Box<dyn StageInlet<T>>, auto_pull: bool) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Self>| {
            inlet.set_listener(me.clone());
            Self {
                inlet,
                auto_pull,
                elements: RefCell::new(Vec::new()),
                outcome: RefCell::new(Outcome::Running),
            }
        })
    }

    pub(crate) fn pull_next(&self) -> Result<(), StreamError> {
        self.inlet.pull()?;
        Ok(())
    }

    pub(crate) fn outcome(&self) -> Outcome {
        self.outcome.borrow().clone()
    }

    pub(crate) fn inlet(&self) -> &dyn StageInlet<T> {
        self.inlet.as_ref()
    }
}

impl<T: Clone> CollectStage<T> {
    pub(crate) fn elements(&self) -> Vec<T> {
        self.elements.borrow().clone()
    }
}

impl<T: 'static> GraphStage for CollectStage<T> {
    fn post_start(&self) -> Result<(), StreamError> {
        if self.auto_pull && !self.inlet.is_closed() {
            self.inlet.pull()?;
        }
        Ok(())
    }
}

impl<T: 'static> InletListener for CollectStage<T> {
    fn on_push(&self) -> Result<(), StreamError> {
        let element = self.inlet.grab()?;
        self.elements.borrow_mut().push(element);
        if self.auto_pull {
            self.inlet.pull()?;
        }
        Ok(())
    }

    fn on_upstream_finish(&self) -> Result<(), StreamError> {
        *self.outcome.borrow_mut() = Outcome::Completed;
        Ok(())
    }

    fn on_upstream_failure(&self, error: StreamError) -> Result<(), StreamError> {
        *self.outcome.borrow_mut() = Outcome::Failed(error.to_string());
        Ok(())
    }
}

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
    static MAX_DEPTH: Cell<usize> = Cell::new(0);
}

/// Deepest nesting of pass-through callbacks seen on this thread since the last reset.
pub(crate) fn max_callback_depth() -> usize {
    MAX_DEPTH.with(Cell::get)
}

pub(crate) fn reset_callback_depth() {
    DEPTH.with(|d| d.set(0));
    MAX_DEPTH.with(|d| d.set(0));
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        let depth = DEPTH.with(|d| {
            d.set(d.get() + 1);
            d.get()
        });
        MAX_DEPTH.with(|m| m.set(m.get().max(depth)));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get() - 1));
    }
}

/// Forwards elements unchanged, tracking how deeply its callbacks nest.
pub(crate) struct PassThroughStage<T> {
    inlet: Box<dyn StageInlet<T>>,
    outlet: Box<dyn StageOutlet<T>>,
}

impl<T: 'static> PassThroughStage<T> {
    pub(crate) fn new(inlet: Box<dyn StageInlet<T>>, outlet: Box<dyn StageOutlet<T>>) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Self>| {
            inlet.set_listener(me.clone());
            outlet.set_listener(me.clone());
            Self { inlet, outlet }
        })
    }
}

impl<T: 'static> GraphStage for PassThroughStage<T> {
    fn post_start(&self) -> Result<(), StreamError> {
        Ok(())
    }
}

impl<T: 'static> InletListener for PassThroughStage<T> {
    fn on_push(&self) -> Result<(), StreamError> {
        let _depth = DepthGuard::enter();
        let element = self.inlet.grab()?;
        self.outlet.push(element)?;
        Ok(())
    }

    fn on_upstream_finish(&self) -> Result<(), StreamError> {
        if !self.outlet.is_closed() {
            self.outlet.complete()?;
        }
        Ok(())
    }

    fn on_upstream_failure(&self, error: StreamError) -> Result<(), StreamError> {
        if !self.outlet.is_closed() {
            self.outlet.fail(error)?;
        }
        Ok(())
    }
}

impl<T: 'static> OutletListener for PassThroughStage<T> {
    fn on_pull(&self) -> Result<(), StreamError> {
        let _depth = DepthGuard::enter();
        self.inlet.pull()?;
        Ok(())
    }

    fn on_downstream_finish(&self) -> Result<(), StreamError> {
        if !self.inlet.is_closed() {
            self.inlet.cancel()?;
        }
        Ok(())
    }
}

/// Source stage emitting the elements of an iterator, one per pull.
pub(crate) struct IterSource<T> {
    outlet: Box<dyn StageOutlet<T>>,
    elements: RefCell<Box<dyn Iterator<Item = T>>>,
    downstream_finished: Cell<usize>,
}

impl<T: 'static> IterSource<T> {
    pub(crate) fn new<I>(outlet: Box<dyn StageOutlet<T>>, elements: I) -> Rc<Self>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Rc::new_cyclic(|me: &Weak<Self>| {
            outlet.set_listener(me.clone());
            Self {
                outlet,
                elements: RefCell::new(Box::new(elements.into_iter())),
                downstream_finished: Cell::new(0),
            }
        })
    }

    pub(crate) fn downstream_finished(&self) -> usize {
        self.downstream_finished.get()
    }
}

impl<T: 'static> GraphStage for IterSource<T> {
    fn post_start(&self) -> Result<(), StreamError> {
        Ok(())
    }
}

impl<T: 'static> OutletListener for IterSource<T> {
    fn on_pull(&self) -> Result<(), StreamError> {
        let next = self.elements.borrow_mut().next();
        match next {
            Some(element) => self.outlet.push(element)?,
            None => self.outlet.complete()?,
        }
        Ok(())
    }

    fn on_downstream_finish(&self) -> Result<(), StreamError> {
        self.downstream_finished.set(self.downstream_finished.get() + 1);
        Ok(())
    }
}

/// Publisher emitting a range of numbers from a tokio task, one per permit of demand.
pub(crate) struct RangePublisher {
    range: Range<u32>,
}

impl RangePublisher {
    pub(crate) fn new(range: Range<u32>) -> Self {
        Self { range }
    }
}

/// Outstanding demand as semaphore permits; cancelling closes the semaphore.
struct RangeSubscription {
    demand: Arc<Semaphore>,
}

impl Subscription for RangeSubscription {
    fn request(&self, n: u64) {
        let room = Semaphore::MAX_PERMITS - self.demand.available_permits();
        let permits = usize::try_from(n).unwrap_or(usize::MAX).min(room);
        self.demand.add_permits(permits);
    }

    fn cancel(&self) {
        self.demand.close();
    }
}

async fn emit_range(
    range: Range<u32>,
    demand: Arc<Semaphore>,
    subscriber: Arc<dyn Subscriber<u32>>,
) -> Result<(), AcquireError> {
    for element in range {
        demand.acquire().await?.forget();
        subscriber.on_next(element);
    }
    subscriber.on_complete();
    Ok(())
}

impl Publisher<u32> for RangePublisher {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u32>>) {
        let demand = Arc::new(Semaphore::new(0));
        subscriber.on_subscribe(Arc::new(RangeSubscription {
            demand: demand.clone(),
        }));
        let range = self.range.clone();
        tokio::spawn(async move {
            // An error only means the subscription was cancelled.
            let _ = emit_range(range, demand, subscriber).await;
        });
    }
}
