pub mod config;
pub mod graphql;
pub mod messages;
pub mod models;
pub mod token;
pub mod utils;

pub use config::*;
pub use messages::*;
pub use models::*;
pub use token::{AccountIdentity, SessionClaims, TokenVerifier, VerifyError};
pub use utils::*;
