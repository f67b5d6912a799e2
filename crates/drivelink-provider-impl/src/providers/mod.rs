pub(crate) mod http_client;
pub mod quark;

pub use quark::{QUARK_KIND, QUARK_LOGIN_URL, QuarkProvider};
