pub mod auth_service;
pub mod events;
pub mod security_events;
pub mod session_store;
pub mod token_service;

pub use auth_service::AuthService;
pub use events::{AuthEvent, EventPublisher};
pub use security_events::SecurityEventRecorder;
pub use session_store::SessionStore;
pub use token_service::{IssuedToken, TokenService};
