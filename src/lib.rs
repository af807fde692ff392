pub mod app;
pub mod app_state;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod notify;
pub mod overlap;
pub mod store;
pub mod token;
