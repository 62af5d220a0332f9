// Auth Service Library

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;

#[cfg(test)]
mod tests;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use models::{AuthResponse, Claims, SecurityEvent, SessionRecord, TokenType, User};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<services::AuthService>,
}
