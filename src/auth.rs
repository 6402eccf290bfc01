//! OAuth2 token models, the credential exchange, and the single-flight token manager.

pub mod exchange;
pub mod manager;
pub mod token;

pub use exchange::*;
pub use manager::*;
pub use token::{record::*, secret::*};
