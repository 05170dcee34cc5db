#![warn(missing_docs)]
//! VisionAI - natural-language photo editing.
//!
//! This crate sends an uploaded photo and an instruction to the Gemini image
//! API and tracks the result in a small editor state machine.
//!
//! # Quick Start
//!
//! ```no_run
//! use visionai::{ClientConfig, Editor, GeminiEditClient, UploadOutcome};
//!
//! #[tokio::main]
//! async fn main() -> visionai::Result<()> {
//!     let client = GeminiEditClient::new(ClientConfig::from_env());
//!     let mut editor = Editor::new();
//!
//!     if let UploadOutcome::Rejected { message } = editor.upload("photo.jpg")? {
//!         eprintln!("{message}");
//!         return Ok(());
//!     }
//!
//!     if let Some(session) = editor.session_mut() {
//!         session.set_prompt("Add fireworks in the sky");
//!     }
//!     editor.generate(&client).await;
//!
//!     if let Some(session) = editor.session() {
//!         println!("status: {}", session.status());
//!         session.download(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `visionai` command-line editor

pub mod config;
pub mod editor;
mod error;
pub mod image;

pub use config::ClientConfig;
pub use editor::{
    EditOutcome, EditSession, EditStatus, Editor, PendingEdit, UploadOutcome, SUGGESTED_PROMPTS,
};
pub use error::{EditError, Result, GENERIC_FAILURE_MESSAGE};
pub use image::{EditClient, EncodedImage, GeminiEditClient, GeminiEditClientBuilder, GeminiModel};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::editor::{EditOutcome, EditStatus, Editor};
    pub use crate::error::{EditError, Result};
    pub use crate::image::{EditClient, EncodedImage, GeminiEditClient};
}
