mod auth;
mod common;
mod config;
