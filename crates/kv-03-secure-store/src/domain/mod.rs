//! # Domain Layer
//!
//! Envelope format and counter rules. Stores are only touched by the
//! service layer.

pub mod config;
pub mod counter;
pub mod envelope;
pub mod reconcile;
