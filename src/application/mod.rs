//! Application layer: Use cases and services.
//!
//! This module wires the pure scoring domain to configuration sources.

mod engine;

pub use engine::ScoringEngine;
