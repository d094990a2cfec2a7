// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default number of elements a subscriber inlet buffers and keeps requested
pub const DEFAULT_BUFFER_HIGH_WATERMARK: usize = 8;
/// Default buffer level at or below which a subscriber inlet requests more
pub const DEFAULT_BUFFER_LOW_WATERMARK: usize = 4;
