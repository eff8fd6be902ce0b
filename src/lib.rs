pub mod config;
pub mod element_finder;
pub mod history;
pub mod models;
pub mod monitor;
pub mod plugins;
pub mod scraper;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use monitor::AllianceMonitor;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
