// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for the Shipwright deployment pipeline
//!
//! This crate contains the entities that are handed from one pipeline
//! component to the next: repository and service descriptors, deploy
//! records, and the derived state of the local working copy.
//!
//! Components never mutate each other's entities; they pass identifiers
//! (remote URL, service id) forward.

pub mod deploy;
pub mod repository;
pub mod service;
pub mod working_copy;

// Re-export commonly used types
pub use deploy::*;
pub use repository::*;
pub use service::*;
pub use working_copy::*;
