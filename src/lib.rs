pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod demo;
pub mod entries;
pub mod errors;
pub mod handlers;
pub mod leaderboard;
pub mod models;
pub mod savings;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{FileStore, MemoryStore, Store};
