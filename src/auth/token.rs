//! Token value types held by [`TokenManager`](crate::auth::TokenManager).

pub mod record;
pub mod secret;
