//! # mbdeploy-compose
//!
//! Turns a sparse stack configuration into a fully-specified, correctly
//! ordered graph of infrastructure resource descriptors.
//!
//! Handles:
//! - **Resolver**: Defaulting and validation of the input configuration.
//! - **Subnet**: Subnet auto-discovery with availability-zone diversity.
//! - **Builders**: Network, data tier, edge, compute, and DNS declarations.
//! - **Environment**: Container environment assembly.
//! - **Graph**: Dependency graph over declared resources.
//! - **Stack**: Ordered composition of all stages against a provisioning backend.
//!
//! The engine never talks to a cloud API. Every resource is handed to a
//! [`ProvisioningBackend`](provider::ProvisioningBackend) and its resolved
//! attributes are awaited before any dependent resource is declared.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builders;
pub mod descriptor;
pub mod environment;
pub mod graph;
pub mod provider;
pub mod resolver;
pub mod stack;
pub mod subnet;
