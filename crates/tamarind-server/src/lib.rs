//! Tamarind Server - process bootstrap
//!
//! Layered configuration, logging, metric descriptions and the background
//! workers that sit around the core services.

pub mod metrics;
pub mod model;
pub mod startup;
