//! Built-in drive login providers.
//!
//! Each provider performs its own network IO through a shared `wreq` client
//! cache keyed by outbound proxy and timeout.

mod builtin;
pub mod providers;
mod registry;

pub use builtin::{BuiltinProviderSeed, builtin_provider_seeds};
pub use providers::QuarkProvider;
pub use registry::register_builtin_providers;
