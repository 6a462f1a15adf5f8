use std::sync::Arc;

use chrono::Duration;

use crate::{
    blob_store::{BlobStore, UrlSigner},
    config::AppConfig,
    notify::{LogNotifier, Notifier},
    payments::{PaymentProcessor, StubPaymentProcessor},
    rate_limit::{RateLimiter, WindowPolicy},
    store::{
        FileRepository, MessageRepository, OrderRepository, QuoteRepository, RateLimitRepository,
        Store,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orders: Arc<dyn OrderRepository>,
    pub files: Arc<dyn FileRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub rate_limits: Arc<dyn RateLimitRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub signer: UrlSigner,
}

impl AppState {
    /// Wire every repository to one backing store, with the log notifier and
    /// stub payment processor as collaborators.
    pub fn new<S: Store + 'static>(
        config: AppConfig,
        store: Arc<S>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let signer = UrlSigner::new(config.jwt_secret.clone(), config.public_base_url.clone());
        let notifier = Arc::new(LogNotifier::new(config.notify_from.clone()));
        Self {
            orders: store.clone(),
            files: store.clone(),
            quotes: store.clone(),
            messages: store.clone(),
            rate_limits: store,
            blobs,
            notifier,
            payments: Arc::new(StubPaymentProcessor),
            signer,
            config: Arc::new(config),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentProcessor>) -> Self {
        self.payments = payments;
        self
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limits.clone(),
            WindowPolicy::new(self.config.rate_limit_max, self.config.rate_limit_window_secs),
        )
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::seconds(self.config.signed_url_ttl_secs)
    }
}
