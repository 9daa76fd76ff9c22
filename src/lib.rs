pub mod cli;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod server;
pub mod service;
pub mod spreadsheet;

pub use db::Database;
pub use service::ContactService;
