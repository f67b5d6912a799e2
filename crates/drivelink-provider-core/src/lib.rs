//! Login capability shared by the redemption engine and the built-in drive
//! providers.
//!
//! This crate does not depend on any HTTP client; implementations live in
//! `drivelink-provider-impl`.

pub mod config;
pub mod errors;
pub mod provider;
pub mod registry;

pub use config::{DisplayField, DisplayFields, lookup, lookup_text, missing_fields};
pub use errors::{ProviderError, ProviderResult};
pub use provider::{LoginCtx, LoginProvider};
pub use registry::{DEFAULT_PROVIDER_KIND, ProviderRegistry};
