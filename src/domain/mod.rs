//! # Domain Layer
//!
//! The domain layer contains the core rules of the realtime server.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (ConnectionSession, Story, CallSession, etc.)
//! - **events**: Realtime events pushed to clients and the delivery envelope
//! - **value_objects**: Immutable value types (Identity)
//! - **services**: Domain services for rules spanning entities
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod events;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use events::*;
pub use services::*;
pub use value_objects::*;
