pub mod app;
pub mod error;
pub mod models;
pub mod ports;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
