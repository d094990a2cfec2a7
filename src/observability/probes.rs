// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Diagnostic wrappers around the Reactive Streams roles.
//!
//! A probe forwards every call unchanged and logs `ENTER`/`LEAVE` around it at
//! `debug` level, or `ERROR` if the wrapped call panics. Probes wrap the
//! subscriptions and subscribers they hand out, so one probe traces a whole
//! publisher/subscriber conversation.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::StreamError;
use crate::traits::{Publisher, Subscriber, Subscription};

static COUNTER: AtomicU64 = AtomicU64::new(1000);

/// Wrap `probed` so every subscriber call is traced under a unique `name-N` label.
pub fn probe_subscriber<T>(name: &str, probed: Arc<dyn Subscriber<T>>) -> Arc<dyn Subscriber<T>>
where
    T: Debug + 'static,
{
    Arc::new(SubscriberProbe {
        probe: Probe::unique(name),
        probed,
    })
}

/// Wrap `probed` so every publisher call, and every call on the subscribers it
/// is handed, is traced under a unique `name-N` label.
pub fn probe_publisher<T>(name: &str, probed: Arc<dyn Publisher<T>>) -> Arc<dyn Publisher<T>>
where
    T: Debug + 'static,
{
    Arc::new(PublisherProbe {
        probe: Probe::unique(name),
        probed,
    })
}

#[derive(Clone)]
struct Probe {
    name: Arc<str>,
}

impl Probe {
    fn unique(name: &str) -> Self {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{}-{}", name, id).into(),
        }
    }

    fn trace<R>(&self, method: &str, description: &dyn Debug, operation: impl FnOnce() -> R) -> R {
        tracing::debug!(probe = %self.name, "ENTER {} {:?}", method, description);
        let guard = LeaveGuard {
            name: &self.name,
            method,
        };
        let result = operation();
        drop(guard);
        result
    }
}

struct LeaveGuard<'a> {
    name: &'a str,
    method: &'a str,
}

impl Drop for LeaveGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::debug!(probe = %self.name, "ERROR {}", self.method);
        } else {
            tracing::debug!(probe = %self.name, "LEAVE {}", self.method);
        }
    }
}

struct SubscriptionProbe {
    probe: Probe,
    probed: Arc<dyn Subscription>,
}

impl Subscription for SubscriptionProbe {
    fn request(&self, n: u64) {
        self.probe.trace("request", &n, || self.probed.request(n));
    }

    fn cancel(&self) {
        self.probe.trace("cancel", &"", || self.probed.cancel());
    }
}

struct SubscriberProbe<T> {
    probe: Probe,
    probed: Arc<dyn Subscriber<T>>,
}

impl<T: Debug + 'static> Subscriber<T> for SubscriberProbe<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.probe.trace("onSubscribe", &"subscription", || {
            let wrapped = Arc::new(SubscriptionProbe {
                probe: self.probe.clone(),
                probed: subscription,
            });
            self.probed.on_subscribe(wrapped)
        });
    }

    fn on_next(&self, item: T) {
        let description = format!("{:?}", item);
        self.probe
            .trace("onNext", &description, || self.probed.on_next(item));
    }

    fn on_error(&self, error: StreamError) {
        let description = error.to_string();
        self.probe
            .trace("onError", &description, || self.probed.on_error(error));
    }

    fn on_complete(&self) {
        self.probe.trace("onComplete", &"", || self.probed.on_complete());
    }
}

struct PublisherProbe<T> {
    probe: Probe,
    probed: Arc<dyn Publisher<T>>,
}

impl<T: Debug + 'static> Publisher<T> for PublisherProbe<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.probe.trace("subscribe", &"subscriber", || {
            let wrapped: Arc<dyn Subscriber<T>> = Arc::new(SubscriberProbe {
                probe: self.probe.clone(),
                probed: subscriber,
            });
            self.probed.subscribe(wrapped)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSubscription {
        calls: Mutex<Vec<String>>,
    }

    impl Subscription for RecordingSubscription {
        fn request(&self, n: u64) {
            self.calls.lock().unwrap().push(format!("request {}", n));
        }

        fn cancel(&self) {
            self.calls.lock().unwrap().push("cancel".to_string());
        }
    }

    #[derive(Default)]
    struct RecordingSubscriber {
        events: Mutex<Vec<String>>,
        subscription: Mutex<Option<Arc<dyn Subscription>>>,
    }

    impl Subscriber<u32> for RecordingSubscriber {
        fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
            self.events.lock().unwrap().push("subscribe".to_string());
            *self.subscription.lock().unwrap() = Some(subscription);
        }

        fn on_next(&self, item: u32) {
            self.events.lock().unwrap().push(format!("next {}", item));
        }

        fn on_error(&self, error: StreamError) {
            self.events.lock().unwrap().push(format!("error {}", error));
        }

        fn on_complete(&self) {
            self.events.lock().unwrap().push("complete".to_string());
        }
    }

    struct SinglePublisher {
        subscription: Arc<RecordingSubscription>,
    }

    impl Publisher<u32> for SinglePublisher {
        fn subscribe(&self, subscriber: Arc<dyn Subscriber<u32>>) {
            subscriber.on_subscribe(self.subscription.clone());
            subscriber.on_next(7);
            subscriber.on_complete();
        }
    }

    #[test]
    fn probed_publisher_forwards_every_call() {
        let subscription = Arc::new(RecordingSubscription::default());
        let publisher = probe_publisher(
            "source",
            Arc::new(SinglePublisher {
                subscription: subscription.clone(),
            }),
        );
        let subscriber = Arc::new(RecordingSubscriber::default());

        publisher.subscribe(subscriber.clone());

        assert_eq!(
            *subscriber.events.lock().unwrap(),
            vec!["subscribe", "next 7", "complete"]
        );

        // The subscription handed through is itself probed but still reaches the wrapped one.
        let handed = subscriber.subscription.lock().unwrap().clone().unwrap();
        handed.request(3);
        handed.cancel();
        assert_eq!(
            *subscription.calls.lock().unwrap(),
            vec!["request 3", "cancel"]
        );
    }

    #[test]
    fn probed_subscriber_forwards_errors() {
        let subscriber = Arc::new(RecordingSubscriber::default());
        let probed = probe_subscriber("sink", subscriber.clone());

        probed.on_error(StreamError::failed("broken"));

        assert_eq!(
            *subscriber.events.lock().unwrap(),
            vec!["error stream failed: broken"]
        );
    }

    #[test]
    fn probe_names_are_unique() {
        let first = Probe::unique("p");
        let second = Probe::unique("p");
        assert_ne!(first.name, second.name);
        assert!(first.name.starts_with("p-"));
    }
}
