//! ChatMentor Shared Library
//!
//! Wire types, domain enumerations and input validators used by the
//! backend and by API clients.

pub mod errors;
pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{AccountStatus, Role, Tag};
pub use types::*;
pub use validation::FieldErrors;
