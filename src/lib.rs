pub mod auth;
pub mod db;
pub mod lifecycle;
pub mod prom_metrics;
pub mod roles;
pub mod server;
