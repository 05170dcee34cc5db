//! Image encoding and the edit request client.

mod client;
pub mod codec;
mod gemini;

pub use client::EditClient;
pub use codec::{
    declared_type_for_path, download_filename, encode_file, encode_reader, extract_content_type,
    is_image_type, strip_encoding_marker, EncodedImage, ImageFormat, DEFAULT_CONTENT_TYPE,
};
pub use gemini::{GeminiEditClient, GeminiEditClientBuilder, GeminiModel};
