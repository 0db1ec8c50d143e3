pub mod chat;
pub mod config;
pub mod db;
pub mod gemini;
pub mod intent;
pub mod models;
pub mod query;
pub mod server;

pub use config::AppConfig;
pub use server::run_server;
