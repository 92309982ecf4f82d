pub mod auth;
pub mod history;
pub mod notifications;
pub mod products;
pub mod stats;
pub mod users;
