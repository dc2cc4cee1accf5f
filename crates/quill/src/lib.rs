pub mod conversation;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod tool;
