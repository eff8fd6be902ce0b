use chrono::Local;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::models::{CheckOutcome, ItemIdentifier, ItemRecord, MonitorState, RunOutcome};
use crate::plugins::NotifierBox;
use crate::plugins::formatting;
use crate::scraper::PageScraper;
use crate::session::SiteSession;
use crate::utils::error::{AppError, Result};
use crate::utils::logging::{CHANGE, HEARTBEAT, LIFECYCLE};

/// Watches the alliance page and reports every change of title.
///
/// Everything runs sequentially: a poll, its detail fetch, the notification
/// and the history write all finish before the next poll starts.
pub struct AllianceMonitor {
    config: AppConfig,
    session: SiteSession,
    scraper: PageScraper,
    history: HistoryStore,
    notifier: NotifierBox,
    state: MonitorState,
}

impl AllianceMonitor {
    pub fn new(config: AppConfig, notifier: NotifierBox) -> Result<Self> {
        let session = SiteSession::new(&config.site)?;
        let scraper = PageScraper::new(config.site.clone(), config.monitor.retry_policy());
        let history = HistoryStore::from_config(&config.storage);

        Ok(Self {
            config,
            session,
            scraper,
            history,
            notifier,
            state: MonitorState::default(),
        })
    }

    /// Replace the predicate deciding which fetch errors are retried. Errors it
    /// rejects reach the main loop instead of settling to "not found".
    pub fn with_retry_trigger(mut self, trigger: fn(&AppError) -> bool) -> Self {
        let policy = self.config.monitor.retry_policy().with_trigger(trigger);
        self.scraper = PageScraper::new(self.config.site.clone(), policy);
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Sign in and announce the title being watched.
    ///
    /// Only a failed sign-in is fatal. A page that cannot be read yet is
    /// reported and watching continues.
    pub async fn start(&mut self) -> Result<()> {
        if !self.session.login().await {
            return Err(AppError::Authentication(
                "could not sign in, check the credentials in .env".to_string(),
            ));
        }

        info!(target: LIFECYCLE, "📚 Reading the alliance's current title...");
        let alliance_url = self.config.site.alliance_url();
        let initial = match self
            .scraper
            .fetch_current_identifier(&self.session, &alliance_url)
            .await
        {
            Ok(initial) => initial,
            Err(e) => {
                warn!("⚠️ Initial read failed: {}", e);
                None
            }
        };

        match initial {
            Some(identifier) => {
                info!(target: LIFECYCLE, "📚 Current title: {}", identifier);
                self.announce_start(&identifier).await;
                self.state.current_identifier = Some(identifier);
            }
            None => {
                warn!("⚠️ Could not read the current title");
                self.notifier.send_text(&formatting::initial_miss_caption()).await;
            }
        }

        info!(
            target: LIFECYCLE,
            "👀 Check interval: {} s; status logged every {} checks",
            self.config.monitor.check_interval_secs,
            self.config.monitor.heartbeat_every
        );
        Ok(())
    }

    async fn announce_start(&self, identifier: &ItemIdentifier) {
        let details = self.fetch_details(identifier).await;
        match details {
            Some(record) => {
                let caption = formatting::started_caption(
                    &record,
                    &self.config.site.alliance_url(),
                    Local::now().naive_local(),
                );
                self.notifier
                    .send_with_optional_photo(record.image.as_deref(), &caption)
                    .await;
            }
            None => {
                self.notifier
                    .send_text(&formatting::started_without_details_caption(identifier))
                    .await;
            }
        }
    }

    /// Poll until `shutdown` reports `true` or recovery from a network error
    /// fails.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> RunOutcome {
        info!(target: LIFECYCLE, "🔄 Monitoring started. Press Ctrl+C to stop.");

        let outcome = loop {
            if *shutdown.borrow() {
                break self.stop().await;
            }

            let pause = match self.check_once().await {
                Ok(_) => self.config.monitor.check_interval(),
                Err(e) if e.is_network() => {
                    warn!("⚠️ Network error: {}", e);
                    info!(
                        target: LIFECYCLE,
                        "🔄 Retrying in {} s",
                        self.config.monitor.network_backoff_secs
                    );
                    if sleep_or_shutdown(&mut shutdown, self.config.monitor.network_backoff()).await {
                        break self.stop().await;
                    }
                    if !self.reauthenticate().await {
                        error!("❌ Re-authentication failed");
                        self.notifier
                            .send_text(&formatting::network_failure_caption())
                            .await;
                        break RunOutcome::NetworkFailure;
                    }
                    continue;
                }
                Err(e) => {
                    error!("⚠️ Unexpected error: {:?}", e);
                    self.config.monitor.error_backoff()
                }
            };

            if sleep_or_shutdown(&mut shutdown, pause).await {
                break self.stop().await;
            }
        };

        info!(target: LIFECYCLE, "✅ Monitoring finished");
        outcome
    }

    /// One iteration of the poll cycle, without the trailing sleep.
    pub async fn check_once(&mut self) -> Result<CheckOutcome> {
        self.state.check_count += 1;
        let check = self.state.check_count;
        let heartbeat = check % self.config.monitor.heartbeat_every.max(1) == 0;

        let current_label = self
            .state
            .current_identifier
            .as_ref()
            .map(ItemIdentifier::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        if heartbeat {
            info!(target: HEARTBEAT, "🔍 Check #{} (title: {})", check, current_label);
        } else {
            debug!("🔍 Check #{}", check);
        }

        let alliance_url = self.config.site.alliance_url();
        let observed = self
            .scraper
            .fetch_current_identifier(&self.session, &alliance_url)
            .await?;

        let Some(observed) = observed else {
            if heartbeat || check == 1 {
                warn!("⚠️ Could not read the current title");
            }
            return Ok(CheckOutcome::Missing);
        };

        if self.state.current_identifier.as_ref() == Some(&observed) {
            return Ok(CheckOutcome::Unchanged(observed));
        }

        Ok(self.handle_change(observed).await)
    }

    async fn handle_change(&mut self, current: ItemIdentifier) -> CheckOutcome {
        let previous = self.state.current_identifier.clone();
        info!(target: CHANGE, "🔔 Title change detected!");
        info!(
            target: CHANGE,
            "   Old: {}",
            previous.as_ref().map(ItemIdentifier::as_str).unwrap_or("none")
        );
        info!(target: CHANGE, "   New: {}", current);

        let record = self.fetch_details(&current).await;
        match &record {
            Some(record) => {
                let caption = formatting::change_caption(
                    record,
                    &self.config.site.alliance_url(),
                    Local::now().naive_local(),
                );
                let delivered = self
                    .notifier
                    .send_with_optional_photo(record.image.as_deref(), &caption)
                    .await;
                self.history.append(record);
                if delivered {
                    info!(target: CHANGE, "✅ Notification sent");
                }
            }
            None => {
                warn!("⚠️ Could not fetch details for {}", current);
                self.notifier
                    .send_text(&formatting::degraded_change_caption(&current))
                    .await;
            }
        }

        // Updated even without details so the same title is not announced twice.
        self.state.current_identifier = Some(current.clone());

        CheckOutcome::Changed {
            previous,
            current,
            record,
        }
    }

    async fn fetch_details(&self, identifier: &ItemIdentifier) -> Option<ItemRecord> {
        match self.scraper.fetch_item_details(&self.session, identifier).await {
            Ok(record) => record,
            Err(e) => {
                error!("❌ Details for {} failed: {}", identifier, e);
                None
            }
        }
    }

    /// Replace the session with a fresh one and sign in again.
    async fn reauthenticate(&mut self) -> bool {
        info!(target: LIFECYCLE, "🔐 Re-authenticating...");
        match SiteSession::new(&self.config.site) {
            Ok(session) => self.session = session,
            Err(e) => {
                error!("❌ Could not rebuild the HTTP session: {}", e);
                return false;
            }
        }
        self.session.login().await
    }

    async fn stop(&self) -> RunOutcome {
        info!(target: LIFECYCLE, "⏹️ Stop signal received");
        self.notifier.send_text(&formatting::stopped_caption()).await;
        RunOutcome::Stopped
    }
}

/// Sleep for `duration`; returns `true` if a stop was requested meanwhile.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone; nobody can ask us to stop any more.
                    tokio::time::sleep_until(deadline).await;
                    return false;
                }
                if *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
