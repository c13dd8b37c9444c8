//! Retention and deletion scheduling for site backups.
//!
//! Periodically retires expired backups and deletes their payloads from the
//! object store, clears provisioning file references from unmanaged sites,
//! purges old operational logs and confirms that dispatched deletes took
//! effect. See [`retention`] for the sweeps themselves.

pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod retention;
pub mod storage;
