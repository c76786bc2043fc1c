//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **ContactRepository** - Read-only access to the directed contact graph
//! - **StoryRepository** - Story persistence, active feed and viewers
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgContactRepository, PgStoryRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let contacts = PgContactRepository::new(pool.clone());
//!     let stories = PgStoryRepository::new(pool.clone());
//! }
//! ```

pub mod contact_repository;
pub mod story_repository;

pub use contact_repository::PgContactRepository;
pub use story_repository::PgStoryRepository;
