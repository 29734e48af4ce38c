//! Authentication and session core.
//!
//! ## Components
//! - `password`: Argon2id credential hashing
//! - `jwt`: HS256 access token codec
//! - `refresh`: Opaque refresh tokens and the store contract
//! - `extract`: `Authorization` header parsing
//! - `directory`: User directory contract
//! - `memory`: In-memory directory and refresh store
//! - `session`: Login / authenticate / refresh / revoke
//! - `error`: Layer errors and the caller-facing taxonomy

pub mod directory;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod refresh;
pub mod session;

// Re-export for convenience
pub use directory::{UserDirectory, UserRecord};
pub use error::{AuthError, ExtractError, HashError, StoreError, TokenError};
pub use extract::{extract_api_key, extract_bearer};
pub use jwt::{AccessClaims, AccessTokenCodec, ISSUER, issue_access_token, verify_access_token};
pub use memory::{MemoryRefreshStore, MemoryUserDirectory};
pub use password::{CredentialHasher, PasswordParams};
pub use refresh::{
    REFRESH_TOKEN_TTL_DAYS, RefreshToken, RefreshTokenStore, generate_refresh_token,
};
pub use session::{IssuedRefreshToken, LoginOutcome, SessionConfig, SessionService};
