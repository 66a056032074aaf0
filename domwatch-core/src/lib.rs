//! Core types for the domwatch domain supervisor.
//!
//! Defines the supervised domain, the operator policy, the per-poll status
//! snapshot and the pure recovery decision that maps them onto an action.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod action;
pub mod domain;
pub mod error;
pub mod policy;

pub use action::{decide, Action};
pub use domain::{DomainId, DomainStatus, ManagedDomain, ShutdownReason};
pub use error::CoreError;
pub use policy::Policy;
