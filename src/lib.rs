//! Project lessons-learned tracking: records, health classification,
//! analytics and the exporters built on them.

pub mod access;
pub mod analytics;
pub mod db;
pub mod export;
pub mod health;
pub mod models;
pub mod report;
