// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::env;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use anyhow::{Context, Result};
use reactive_stages::config::{load_and_validate_config, EngineConfig};
use reactive_stages::engine::{BuiltGraph, CancelStage};
use reactive_stages::errors::StreamError;
use reactive_stages::observability::init_tracing;
use reactive_stages::observability::probes::probe_subscriber;
use reactive_stages::traits::{
    GraphStage, InletListener, Publisher, StageInlet, Subscriber, Subscription,
};
use tokio::sync::{oneshot, AcquireError, Semaphore};

const DEFAULT_COUNT: u64 = 20;

/// Publisher that counts from zero on a tokio task, one element per permit of demand.
struct CountingPublisher {
    count: u64,
}

/// Outstanding demand as semaphore permits; cancelling closes the semaphore.
struct CountingSubscription {
    demand: Arc<Semaphore>,
}

impl Subscription for CountingSubscription {
    fn request(&self, n: u64) {
        let room = Semaphore::MAX_PERMITS - self.demand.available_permits();
        let permits = usize::try_from(n).unwrap_or(usize::MAX).min(room);
        self.demand.add_permits(permits);
    }

    fn cancel(&self) {
        self.demand.close();
    }
}

async fn emit_count(
    count: u64,
    demand: Arc<Semaphore>,
    subscriber: Arc<dyn Subscriber<u64>>,
) -> Result<(), AcquireError> {
    for n in 0..count {
        demand.acquire().await?.forget();
        subscriber.on_next(n);
    }
    subscriber.on_complete();
    Ok(())
}

impl Publisher<u64> for CountingPublisher {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u64>>) {
        let demand = Arc::new(Semaphore::new(0));
        subscriber.on_subscribe(Arc::new(CountingSubscription {
            demand: demand.clone(),
        }));
        let count = self.count;
        tokio::spawn(async move {
            if emit_count(count, demand, subscriber).await.is_err() {
                println!("  ✂️  publisher stopped: subscription cancelled");
            }
        });
    }
}

/// Terminal stage printing every element it receives.
struct PrintSink {
    inlet: Box<dyn StageInlet<u64>>,
    received: Cell<u64>,
    sum: Cell<u64>,
    outcome: RefCell<Option<String>>,
}

impl PrintSink {
    fn new(inlet: Box<dyn StageInlet<u64>>) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Self>| {
            inlet.set_listener(me.clone());
            Self {
                inlet,
                received: Cell::new(0),
                sum: Cell::new(0),
                outcome: RefCell::new(None),
            }
        })
    }
}

impl GraphStage for PrintSink {
    fn post_start(&self) -> Result<(), StreamError> {
        self.inlet.pull()?;
        Ok(())
    }
}

impl InletListener for PrintSink {
    fn on_push(&self) -> Result<(), StreamError> {
        let n = self.inlet.grab()?;
        println!("  📦 received {}", n);
        self.received.set(self.received.get() + 1);
        self.sum.set(self.sum.get() + n);
        self.inlet.pull()?;
        Ok(())
    }

    fn on_upstream_finish(&self) -> Result<(), StreamError> {
        *self.outcome.borrow_mut() = Some("completed".to_string());
        Ok(())
    }

    fn on_upstream_failure(&self, error: StreamError) -> Result<(), StreamError> {
        *self.outcome.borrow_mut() = Some(format!("failed: {}", error));
        Ok(())
    }
}

async fn run_print_pipeline(config: &EngineConfig, count: u64) -> Result<()> {
    println!("🔄 Publisher → SubscriberInlet → PrintSink");
    println!(
        "   buffer: high watermark {}, low watermark {}",
        config.buffer.high_watermark, config.buffer.low_watermark
    );

    let mut graph = BuiltGraph::new();
    let (inlet, subscriber) = graph.subscriber_inlet::<u64>(config.buffer)?;
    let sink = PrintSink::new(Box::new(inlet));
    graph.add_stage(sink.clone());

    CountingPublisher { count }.subscribe(probe_subscriber("print-inlet", Arc::new(subscriber)));
    graph.run().await?;

    println!(
        "✅ {} elements, sum {}, stream {}",
        sink.received.get(),
        sink.sum.get(),
        sink.outcome.borrow().as_deref().unwrap_or("still running")
    );
    Ok(())
}

async fn run_cancel_pipeline(config: &EngineConfig, count: u64) -> Result<()> {
    println!("🛑 Publisher → SubscriberInlet → CancelStage");

    let mut graph = BuiltGraph::new();
    let (inlet, subscriber) = graph.subscriber_inlet::<u64>(config.buffer)?;
    let (done_tx, done_rx) = oneshot::channel();
    graph.add_stage(CancelStage::new(Box::new(inlet), done_tx));

    graph.start()?;
    done_rx.await.context("cancel stage dropped without signalling")?;

    // The subscription arrives after the inlet already cancelled, so it is cancelled straight away.
    CountingPublisher { count }.subscribe(Arc::new(subscriber));
    graph.run_until_idle()?;
    // Let the publisher task observe the closed subscription.
    tokio::task::yield_now().await;

    println!("✅ Stream cancelled before any element was requested");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing("info");

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        eprintln!("Usage: {} [config.yaml] [count]", args[0]);
        eprintln!("Example: {} configs/buffer.yaml 50", args[0]);
        return Ok(());
    }

    let config = match args.get(1) {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("loading engine config from {}", path))?,
        None => EngineConfig::default(),
    };
    let count = match args.get(2) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid element count '{}'", raw))?,
        None => DEFAULT_COUNT,
    };

    println!("🚀 Reactive Stages Demo");
    println!("═══════════════════════");
    println!();

    run_print_pipeline(&config, count).await?;
    println!("\n{}", "─".repeat(60));
    run_cancel_pipeline(&config, count).await?;

    println!("\n🎉 Demo complete!");
    Ok(())
}
