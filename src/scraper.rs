use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SiteConfig;
use crate::element_finder::{self, IDENTIFIER_STRATEGIES};
use crate::models::{ItemIdentifier, ItemRecord};
use crate::session::SiteSession;
use crate::utils::error::{AppError, Result};
use crate::utils::retry::RetryPolicy;

/// Reads the alliance page and title pages through a [`SiteSession`].
pub struct PageScraper {
    site: SiteConfig,
    retry: RetryPolicy,
}

impl PageScraper {
    pub fn new(site: SiteConfig, retry: RetryPolicy) -> Self {
        Self { site, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Identifier of the title currently shown at `url`.
    ///
    /// `Ok(None)` once every attempt has failed with a retryable error;
    /// `Err` only for errors the retry trigger refuses to retry.
    pub async fn fetch_current_identifier(
        &self,
        session: &SiteSession,
        url: &str,
    ) -> Result<Option<ItemIdentifier>> {
        let result = self
            .retry
            .run("Identifier fetch", || self.read_identifier(session, url))
            .await;
        self.settle(result, url)
    }

    /// Title page details for `identifier`.
    ///
    /// Missing title or image never fails the call: the title falls back to
    /// the identifier and the image to `None`.
    pub async fn fetch_item_details(
        &self,
        session: &SiteSession,
        identifier: &ItemIdentifier,
    ) -> Result<Option<ItemRecord>> {
        let url = self.site.item_url(identifier.as_str());
        let result = self
            .retry
            .run("Details fetch", || self.read_details(session, &url, identifier))
            .await;
        self.settle(result, &url)
    }

    async fn read_identifier(&self, session: &SiteSession, url: &str) -> Result<ItemIdentifier> {
        let html = session.get_html(url, self.timeout()).await?;
        element_finder::find_identifier(&html).ok_or_else(|| AppError::ElementNotFound {
            selector: element_finder::describe(IDENTIFIER_STRATEGIES),
        })
    }

    async fn read_details(
        &self,
        session: &SiteSession,
        url: &str,
        identifier: &ItemIdentifier,
    ) -> Result<ItemRecord> {
        let html = session.get_html(url, self.timeout()).await?;
        let details = element_finder::find_item_details(&html);

        let title = details.title.unwrap_or_else(|| {
            debug!("No title element on {}, using the slug", url);
            identifier.to_string()
        });
        let image = details
            .image
            .and_then(|src| absolutize(self.site.root_url(), &src));

        info!("✅ Details fetched: {}", title);
        Ok(ItemRecord::new(identifier.clone(), title, image))
    }

    fn settle<T>(&self, result: Result<T>, url: &str) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.retry.should_retry(&e) => {
                warn!(
                    "⚠️ Giving up on {} after {} attempts: {}",
                    url, self.retry.max_attempts, e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn timeout(&self) -> Duration {
        self.site.request_timeout()
    }
}

/// Resolve `src` against the site origin. Absolute URLs pass through.
pub fn absolutize(base: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    match Url::parse(base).and_then(|base| base.join(src)) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Cannot resolve image '{}' against {}: {}", src, base, e);
            None
        }
    }
}
