pub mod config;
pub mod db;
pub mod error;
pub mod gateways;
pub mod handlers;
pub mod id;
pub mod models;
pub mod notify;
pub mod pricing;
pub mod reconcile;
