pub mod config;
pub mod context;
pub mod user;
pub mod watchlist;
