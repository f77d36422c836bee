//! Project manifest handling for Flux.
//!
//! Locates `flux.yaml`, layers it over built-in defaults and `FLUX_*`
//! environment overrides, and validates the result.

pub mod config;
pub mod discovery;
pub mod error;
pub mod sections;
pub mod validation;

pub use config::*;
pub use error::*;
pub use sections::*;

pub use discovery::{find_project_root, load, load_from};
pub use validation::{MAX_PROXY_PORT, validate};
