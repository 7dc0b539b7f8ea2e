// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route protection: the in-page guard and the edge gate.

pub mod edge_gate;
pub mod guard;

pub use edge_gate::edge_gate;
pub use guard::{evaluate, wait_for_decision, GuardDecision};
