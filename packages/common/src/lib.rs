pub mod cache;
pub mod config;
pub mod reconcile;
pub mod storage;

pub use reconcile::{ReconcileError, ReconcileSummary, Reconciler};
