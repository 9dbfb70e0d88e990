pub mod app;
pub mod catalog;
pub mod config;
pub mod diary;
pub mod error;
pub mod handlers;
pub mod hunyuan;
pub mod image_generation;
pub mod image_processing;
pub mod reconstruction;
pub mod storage;
pub mod url_validation;
pub mod web_pages;

pub use app::{AppState, create_router};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
