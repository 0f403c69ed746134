// ============================
// tradingroom-backend/src/auth/mod.rs
// ============================
//! Authentication module: caller identity and media access tokens.

pub mod identity;
pub mod token_issuer;

pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider};
pub use token_issuer::{LiveKitTokenIssuer, RoomGrant, TokenError, TokenIssuer};
