//! sqlx-backed implementations of the collaborator interfaces.

pub mod notification;
pub mod token;
pub mod user;

pub use notification::NotificationRepository;
pub use token::ApiTokenRepository;
pub use user::UserRepository;
