//! Application layer containing the purchase session orchestration.
//!
//! This module defines the `PurchaseSessionController`, which owns the single
//! purchase session and runs every provider call on a spawned `tokio` task so
//! callers never wait on the billing service.

pub mod config;
pub mod controller;
pub mod notifier;
