//! PageHost Observability
//!
//! This crate provides the operational surface of the server:
//! - Metrics collection (Prometheus)
//! - Health and readiness endpoints

pub mod health;
pub mod metrics;
