//! # localrag-server
//!
//! HTTP server and command line for [`localrag`], wired to a local Ollama
//! for embeddings and generation and to Qdrant for vector storage.
//!
//! Settings come from the environment (optionally a `.env` file); see
//! [`settings::Settings`].

pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod server;
pub mod settings;
pub mod telemetry;

pub use error::ApiError;
pub use server::{AppState, app_router, run_server};
pub use settings::{LogFormat, Settings};
