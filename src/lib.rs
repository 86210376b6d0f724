//! Synopsis PDF summarizer
//!
//! Extracts the text of an uploaded PDF and condenses it with a pretrained
//! sequence-to-sequence model, served behind a small browser UI.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
