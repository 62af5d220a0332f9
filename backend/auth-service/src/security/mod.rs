pub mod jwt;
pub mod lockout;
pub mod password;
pub mod token_revocation;

pub use jwt::TokenCodec;
pub use lockout::{LockoutPolicy, LockoutTransition};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use token_revocation::RevocationRegistry;
