//! Deployment engine for mbdeploy stacks.
//!
//! Drives a [`StackComposer`](mbdeploy_compose::stack::StackComposer)
//! against a provisioning backend and an inventory of existing
//! infrastructure, and renders the resulting plan.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod engine;
pub mod lookup;
pub mod plan;
