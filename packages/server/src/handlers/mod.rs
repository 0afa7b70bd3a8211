pub mod collection;
pub mod config;
pub mod health;
