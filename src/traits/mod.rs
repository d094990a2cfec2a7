// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod port;
pub mod reactive;
pub mod stage;

pub use port::Port;
pub use reactive::{Publisher, Subscriber, Subscription};
pub use stage::{GraphStage, InletListener, OutletListener, StageInlet, StageOutlet};
