//! Edit client trait.

use crate::error::Result;
use crate::image::codec::EncodedImage;
use async_trait::async_trait;

/// A service that turns an image plus an instruction into a new image.
///
/// One call performs exactly one exchange. Failures are returned unchanged;
/// retry policy belongs to the caller.
#[async_trait]
pub trait EditClient: Send + Sync {
    /// Requests an edit of `image` following `prompt`.
    async fn request_edit(&self, image: &EncodedImage, prompt: &str) -> Result<EncodedImage>;

    /// Returns the name of this client for display.
    fn name(&self) -> &str;

    /// Checks if the service is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
