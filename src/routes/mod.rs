pub mod auth;
pub mod categories;
pub mod moderation;
pub mod resources;
pub mod submissions;
