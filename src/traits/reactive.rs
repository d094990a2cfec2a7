// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The Reactive Streams roles a graph talks to at its boundaries.
//!
//! Implementations may be called from any thread, so every role is
//! `Send + Sync`. A `Subscriber` must never see two of its callbacks overlap.

use std::sync::Arc;

use crate::errors::StreamError;

/// A provider of a potentially unbounded number of sequenced elements.
pub trait Publisher<T>: Send + Sync {
    /// Request the publisher to start streaming to `subscriber`.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Receiver of a publisher's signals.
pub trait Subscriber<T>: Send + Sync {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    fn on_next(&self, item: T);

    fn on_error(&self, error: StreamError);

    fn on_complete(&self);
}

/// A one-to-one lifecycle between a subscriber and a publisher.
pub trait Subscription: Send + Sync {
    /// Signal demand for `n` more elements.
    fn request(&self, n: u64);

    /// Ask the publisher to stop sending and release resources.
    fn cancel(&self);
}
