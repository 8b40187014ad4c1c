//! # nicprov Common
//!
//! Shared utilities for the nicprov components.
//!
//! ## Logging
//!
//! ```rust,ignore
//! use nicprov_common::init_logging;
//!
//! init_logging("info").unwrap();
//! tracing::info!(domain_id = "0b6f...", "Attaching interfaces");
//! ```

pub mod logging;

pub use logging::{init_logging, init_logging_json};
