// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Tenant Reconciler - AWS Tenant Cluster Reconciliation Engine
//!
//! The tenant reconciler converges the AWS infrastructure of many independent
//! tenant clusters toward the clusters declared as `AWSCluster` objects.
//!
//! ## Overview
//!
//! Every reconciliation pass runs an ordered pipeline of steps against one
//! cluster. Steps share a per-pass [`context::ScratchContext`]: discovery steps
//! record what exists in the cloud, the zone allocator computes the subnet
//! layout, and the control plane stack step renders and applies it.
//!
//! ## Modules
//!
//! - [`pipeline`] - Step contract, pipeline runner, retry and metrics decorators
//! - [`resources`] - The reconciliation steps and the stock pipelines
//! - [`context`] - Tenant cluster view and the per-pass scratch context
//! - [`ipam`] - IPv4 network arithmetic used by the zone allocator
//! - [`cloud`] - Cloud API collaborator contracts
//! - [`controller`] - kube-rs controller wiring and finalizers
//! - [`crd`] - Watched custom resources
//!
//! ## Example
//!
//! ```rust
//! use tenant_reconciler::ipam::Ipv4Network;
//!
//! let tenant: Ipv4Network = "10.100.8.0/24".parse().unwrap();
//! let blocks = tenant.split(4).unwrap();
//! let (public, private) = blocks[0].halves().unwrap();
//!
//! assert_eq!(public.to_string(), "10.100.8.0/27");
//! assert_eq!(private.to_string(), "10.100.8.32/27");
//! ```

pub mod cache;
pub mod cloud;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod encrypter;
pub mod errors;
pub mod ipam;
pub mod labels;
pub mod metrics;
pub mod pipeline;
pub mod resources;
pub mod telemetry;

#[cfg(test)]
mod testing;
