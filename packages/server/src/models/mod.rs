pub mod config;
pub mod coupon;
pub mod gallery;
pub mod reconcile;
pub mod shared;
pub mod timeline;
