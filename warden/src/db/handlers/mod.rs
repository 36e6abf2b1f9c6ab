//! Postgres repository implementations.
//!
//! Each repository wraps a `PgPool` and implements one of the traits in [`repository`]. Queries
//! are single statements, so no explicit transactions are needed; cascading deletes are left to
//! the foreign keys declared in the migrations.
//!
//! # Available Repositories
//!
//! - [`Users`]: account records
//! - [`Tokens`]: the refresh/access pair each user may hold
//! - [`Items`]: user-owned items
//!
//! ```ignore
//! use warden::db::handlers::{UserRepository, Users};
//!
//! let users = Users::new(pool.clone());
//! if let Some(user) = users.get_by_email("user@example.com").await? {
//!     println!("Found user: {}", user.username);
//! }
//! ```

pub mod items;
pub mod repository;
pub mod tokens;
pub mod users;

pub use items::Items;
pub use repository::{ItemFilter, ItemRepository, TokenRepository, UserFilter, UserRepository};
pub use tokens::Tokens;
pub use users::Users;
