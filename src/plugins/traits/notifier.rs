use async_trait::async_trait;

/// Delivery channel for monitor notifications.
///
/// Captions use Telegram's HTML subset (`<b>`, `<code>`, `<a>`). Both calls
/// are best-effort: implementations log failures and report them as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send_text(&self, caption: &str) -> bool;

    async fn send_photo(&self, image_url: &str, caption: &str) -> bool;

    /// Photo when an image is known, plain text otherwise.
    async fn send_with_optional_photo(&self, image_url: Option<&str>, caption: &str) -> bool {
        match image_url {
            Some(image_url) => self.send_photo(image_url, caption).await,
            None => self.send_text(caption).await,
        }
    }
}

pub type NotifierBox = Box<dyn Notifier>;
