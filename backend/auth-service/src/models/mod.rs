pub mod security_event;
pub mod session;
pub mod token;
pub mod user;

pub use security_event::{SecurityEvent, SecurityEventType, Severity};
pub use session::{SessionRecord, SessionUpdate};
pub use token::{Claims, TokenMetadata, TokenType};
pub use user::{AccountSecurityState, AuthResponse, User};
