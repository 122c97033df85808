//! Service Configuration Module
//!
//! Provides the service configuration loaded from TOML files, replacing the
//! module-level constants (model directory, default model name, forest size,
//! grid resolution) with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `YIELDCAST_CONFIG` environment variable (path to TOML file)
//! 2. `yieldcast.toml` in the current working directory
//! 3. Built-in defaults (the reference values in `defaults.rs`)
//!
//! ## Usage
//!
//! Load once in `main()` and hand an `Arc` to every component:
//!
//! ```ignore
//! let config = Arc::new(ServiceConfig::load());
//! let service = YieldService::open(Arc::clone(&config))?;
//! ```

mod service_config;
pub mod defaults;
pub mod validation;

pub use service_config::*;
