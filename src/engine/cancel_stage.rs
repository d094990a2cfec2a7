// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;

use crate::errors::StreamError;
use crate::traits::{GraphStage, InletListener, StageInlet};

/// Terminal stage that cancels its inlet as soon as the graph starts.
///
/// `done` resolves once the cancellation has been issued, so callers can
/// await the stage without polling the graph.
pub struct CancelStage<T> {
    inlet: Box<dyn StageInlet<T>>,
    done: RefCell<Option<oneshot::Sender<()>>>,
}

impl<T: 'static> CancelStage<T> {
    pub fn new(inlet: Box<dyn StageInlet<T>>, done: oneshot::Sender<()>) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Self>| {
            inlet.set_listener(me.clone());
            Self {
                inlet,
                done: RefCell::new(Some(done)),
            }
        })
    }
}

impl<T: 'static> GraphStage for CancelStage<T> {
    fn post_start(&self) -> Result<(), StreamError> {
        if !self.inlet.is_closed() {
            self.inlet.cancel()?;
        }
        if let Some(done) = self.done.borrow_mut().take() {
            // Nobody waiting is fine.
            let _ = done.send(());
        }
        Ok(())
    }
}

impl<T: 'static> InletListener for CancelStage<T> {
    fn on_push(&self) -> Result<(), StreamError> {
        Ok(())
    }

    fn on_upstream_finish(&self) -> Result<(), StreamError> {
        Ok(())
    }

    fn on_upstream_failure(&self, _error: StreamError) -> Result<(), StreamError> {
        Ok(())
    }
}
