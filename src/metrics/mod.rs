//! Metrics export.
//!
//! Check results can additionally be pushed to a Prometheus Push Gateway so
//! that `days_remaining` can be graphed outside the monitoring supervisor.
//!
//! # Submodules
//!
//! - `prom` - Prometheus metrics integration

pub mod prom;
