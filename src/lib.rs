// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // buffer config + YAML loading
pub mod engine;     // graph context, ports, built-in stages
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // reactive streams + stage contracts
