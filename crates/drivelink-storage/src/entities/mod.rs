pub mod accounts;
pub mod global_config;
pub mod links;
pub mod providers;

pub use accounts::Entity as Accounts;
pub use global_config::Entity as GlobalConfig;
pub use links::Entity as Links;
pub use providers::Entity as Providers;
