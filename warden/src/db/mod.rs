//! Persistence layer.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │  Arc<dyn UserRepository / TokenRepository / ItemRepository>
//!        ↓
//! ┌─────────────┐      ┌─────────────┐
//! │  handlers   │  or  │   memory    │
//! └──────┬──────┘      └─────────────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: repository traits and their Postgres implementations
//! - [`memory`]: in-memory implementations of the same traits
//! - [`models`]: records passed to and returned from repositories
//! - [`errors`]: repository error type

pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
