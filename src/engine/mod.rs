// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod built_graph;
mod cancel_stage;
mod context;
mod stage_outlet_inlet;
mod subscriber_inlet;

#[cfg(test)]
mod test_support;

pub use built_graph::BuiltGraph;
pub use cancel_stage::CancelStage;
pub use context::{GraphContext, PortId};
pub use stage_outlet_inlet::{Inlet, Outlet, StageOutletInlet};
pub use subscriber_inlet::{InletSubscriber, SubscriberInlet};
