use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, DNT, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, info};

use crate::config::SiteConfig;
use crate::element_finder;
use crate::utils::error::{AppError, Result};
use crate::utils::logging::LIFECYCLE;

/// Cookie-carrying HTTP session against the watched site.
pub struct SiteSession {
    client: Client,
    site: SiteConfig,
}

impl SiteSession {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(site.user_agent.as_str())
            .default_headers(default_headers(site))
            .build()?;

        Ok(Self {
            client,
            site: site.clone(),
        })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// GET `url` and return the body of a 200 response.
    pub async fn get_html(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// Sign in with the configured credentials.
    ///
    /// Returns `true` only when the site renders the signed-in profile marker
    /// afterwards. Every failure is logged and reported as `false`.
    pub async fn login(&self) -> bool {
        info!(target: LIFECYCLE, "🔐 Signing in to {}", self.site.root_url());

        match self.try_login().await {
            Ok(()) => {
                info!(target: LIFECYCLE, "✅ Signed in");
                true
            }
            Err(AppError::Authentication(reason)) => {
                error!("❌ Sign-in rejected: {}", reason);
                false
            }
            Err(e) => {
                error!("❌ Sign-in failed: {}", e);
                false
            }
        }
    }

    async fn try_login(&self) -> Result<()> {
        let root = self.site.root_url();
        let timeout = self.site.login_timeout();

        let landing = self.get_html(root, timeout).await?;
        let csrf_token = element_finder::find_csrf_token(&landing);

        let mut form = vec![
            ("email", self.site.email.as_str()),
            ("password", self.site.password.as_str()),
        ];
        if let Some(token) = csrf_token.as_deref() {
            form.push(("_token", token));
        }

        let login_url = self.site.login_url();
        let response = self
            .client
            .post(&login_url)
            .form(&form)
            .timeout(timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AppError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: login_url,
            });
        }

        let check = self.get_html(root, timeout).await?;
        if element_finder::is_authenticated(&check) {
            Ok(())
        } else {
            Err(AppError::Authentication(
                "profile not shown after login, check email and password".to_string(),
            ))
        }
    }
}

fn default_headers(site: &SiteConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&site.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}
