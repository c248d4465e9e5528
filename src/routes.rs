pub mod auth;
pub mod books;
pub mod documents;
mod health_check;
pub mod news;
pub mod users;

pub use health_check::*;
