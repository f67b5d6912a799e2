pub mod entities;
pub mod expiry;
pub mod rows;
pub mod seaorm;
pub mod storage;
mod token;

pub use expiry::{ExpiryParseError, format_expiry, parse_expiry};
pub use rows::{AccountRow, GlobalConfigRow, LinkRow, ProviderRow, REDEMPTION_STEP};
pub use seaorm::SeaOrmStorage;
pub use storage::{
    DashboardCounts, LinkMetaUpdate, NewLink, Storage, StorageError, StorageResult,
};
