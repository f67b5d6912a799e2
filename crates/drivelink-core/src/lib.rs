pub mod auth;
pub mod bootstrap;
pub mod engine;
pub mod guard;
pub mod link_input;
pub mod state;

pub use auth::{hash_admin_key, verify_admin_key};
pub use bootstrap::{Bootstrap, CliArgs, bootstrap, redact_dsn};
pub use engine::{
    LinkView, LoginSettings, REDEMPTION_STEP, Redemption, RedemptionEngine, Refusal, evaluate,
};
pub use guard::{DeleteOutcome, delete_account_guarded, delete_provider_guarded};
pub use link_input::{LinkInputError, check_total_quota, parse_expiry_input};
pub use state::AppState;
