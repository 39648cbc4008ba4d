//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories and external systems.

pub mod auth;
pub mod document;
pub mod tag;
pub mod user;

pub use auth::{AuthService, RegisterInput};
pub use document::{DocumentService, Upload};
pub use tag::TagService;
pub use user::UserService;
