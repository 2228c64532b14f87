// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

pub use autoshrink::{Autoshrink, AutoshrinkConfig, DEFAULT_MAX_FAILED_SHRINKS};
pub use model::{Action, Model, Mutation};
pub use pool::{BitPool, DEFAULT_POOL_SIZE, PrintMode};

mod autoshrink;
mod model;
mod mutate;
mod pool;
