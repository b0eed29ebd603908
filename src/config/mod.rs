//! Configuration loading for the tax engine.
//!
//! This module loads the transition rate schedule and regional IBS rate
//! overrides from YAML files. The loaded configuration implements
//! [`RateProvider`](crate::engine::RateProvider).
//!
//! # Example
//!
//! ```no_run
//! use brtax_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/statutory").unwrap();
//! println!("Loaded schedule: {}", config.metadata().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{OverrideEntry, OverrideFile, RegionalOverride, ScheduleFile, ScheduleMetadata};
