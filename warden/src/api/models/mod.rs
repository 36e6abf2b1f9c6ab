pub mod auth;
pub mod items;
pub mod pagination;
pub mod users;
