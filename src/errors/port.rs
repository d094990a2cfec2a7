// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Usage faults raised by inlets and outlets.
//!
//! A `PortError` always means a stage called a port out of order. The call that
//! raised it has not touched any port state.

/// Errors raised when a stage misuses one of its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("can't push element after complete")]
    PushAfterComplete,
    #[error("can't push element to outlet when it hasn't pulled")]
    PushWithoutPull,
    #[error("can't complete twice")]
    CompleteTwice,
    #[error("can't pull after complete")]
    PullAfterComplete,
    #[error("can't pull twice")]
    PullTwice,
    #[error("can't pull without having grabbed the previous element")]
    PullWithoutGrab,
    #[error("can't cancel twice")]
    CancelTwice,
    #[error("grab without onPush notification")]
    GrabWithoutPush,
    #[error("can't grab when finished")]
    GrabWhenFinished,
    #[error("can't grab when not pulled")]
    GrabWhenNotPulled,
    /// The listener registered on the other side of the port has been dropped.
    #[error("{side} listener is no longer registered")]
    ListenerGone { side: &'static str },
}
