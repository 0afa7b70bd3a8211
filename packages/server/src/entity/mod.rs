pub mod app_config;
pub mod coupon;
pub mod gallery_item;
pub mod timeline_event;
