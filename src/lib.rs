//! Hire Power: chat with an AI assistant about uploaded PDF resumes.

pub mod chain;
pub mod config;
pub mod doc_processor;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod routes;
pub mod server;
pub mod state;
pub mod vector_store;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use server::{build_router, serve};
pub use state::AppState;
