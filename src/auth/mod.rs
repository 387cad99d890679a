//! Authentication module
//!
//! Password-based login for multi-tenant identities:
//! - bcrypt credential hashing
//! - RS256 access/refresh token pairs
//! - refresh rotation with reuse detection and cascading revocation

mod jwt;
mod password;
mod service;

pub use jwt::{Claims, JwtError, TokenSigner, TokenType, TokenVerifier};
pub use password::{HashError, PasswordHasher};
pub use service::{AuthError, AuthService};
