//! Trait seams between the core and the transport layer.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RecipientId;

/// Outbound message transport. One implementation per chat platform; the
/// dispatcher treats every failure as local to that recipient.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<()>;

    /// Send a photo with a caption. `image` holds the raw file bytes,
    /// `file_name` the name used for the upload.
    async fn send_photo(
        &self,
        recipient: RecipientId,
        image: Vec<u8>,
        file_name: &str,
        caption: &str,
    ) -> Result<()>;
}
