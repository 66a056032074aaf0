//! Command-line front end for the domwatch domain supervisor.
//!
//! Turns flags and an optional JSON policy file into a [`Policy`], sets up
//! logging, and runs the startup sequence that ends in the monitoring loop.
//!
//! [`Policy`]: domwatch_core::Policy

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod cli;
pub mod logging;
