use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::events::Toast;
use storage::Storage;
use tokio::sync::{broadcast, Mutex};

pub mod access;
pub mod aggregate;
pub mod auth;
pub mod backend;
pub mod error;
pub mod pension;
pub mod validation;

pub use auth::{AuthAction, AuthState, AuthStore, SESSION_STORAGE_KEY};
pub use backend::{MockPensionBackend, PensionBackend, UnavailablePensionBackend};
pub use pension::{LoadingFlags, PensionAction, PensionState, PensionStore, Resource};

const TOAST_CHANNEL_CAPACITY: usize = 64;

/// Durable key/value storage holding the persisted session record.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl LocalStorage for Storage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Storage::get_item(self, key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        Storage::set_item(self, key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        Storage::remove_item(self, key).await.map(|_| ())
    }
}

/// Process-local storage, used when nothing should outlive the process.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut items = HashMap::new();
        items.insert(key.into(), value.into());
        Self {
            items: Mutex::new(items),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.items.lock().await.contains_key(key)
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Self(noon.and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of the simulated network latency in front of every mock call.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn delay(&self, duration: Duration);
}

pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Completes every delay immediately, still yielding once so that pending
/// operations interleave.
pub struct InstantScheduler;

#[async_trait]
impl Scheduler for InstantScheduler {
    async fn delay(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Latency {
    pub login: Duration,
    pub password_reset: Duration,
    pub fetch: Duration,
    pub notifications: Duration,
    pub contribution: Duration,
    pub statement: Duration,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            login: Duration::from_millis(1000),
            password_reset: Duration::from_millis(1000),
            fetch: Duration::from_millis(1000),
            notifications: Duration::from_millis(800),
            contribution: Duration::from_millis(1000),
            statement: Duration::from_millis(1500),
        }
    }
}

impl Latency {
    pub fn uniform(duration: Duration) -> Self {
        Self {
            login: duration,
            password_reset: duration,
            fetch: duration,
            notifications: duration,
            contribution: duration,
            statement: duration,
        }
    }

    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub latency: Latency,
    /// Opening balance of a generated statement when no earlier statement
    /// precedes its range.
    pub base_opening_balance: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            latency: Latency::default(),
            base_opening_balance: 1_000_000.0,
        }
    }
}

pub(crate) fn toast_channel() -> broadcast::Sender<Toast> {
    let (toasts, _) = broadcast::channel(TOAST_CHANNEL_CAPACITY);
    toasts
}

pub(crate) fn emit_toast(toasts: &broadcast::Sender<Toast>, toast: Toast) {
    // No subscriber is not an error.
    let _ = toasts.send(toast);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_round_trips_items() {
        let storage = MemoryStorage::new();
        storage.set_item("user", "{}").await.expect("set");
        assert_eq!(
            storage.get_item("user").await.expect("get").as_deref(),
            Some("{}")
        );
        storage.remove_item("user").await.expect("remove");
        assert!(!storage.contains("user").await);
    }

    #[tokio::test]
    async fn sqlite_storage_satisfies_local_storage() {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        let local: &dyn LocalStorage = &storage;
        local.set_item("user", "value").await.expect("set");
        assert_eq!(
            local.get_item("user").await.expect("get").as_deref(),
            Some("value")
        );
        local.remove_item("user").await.expect("remove");
        local.remove_item("user").await.expect("remove is idempotent");
        assert!(local.get_item("user").await.expect("get").is_none());
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).expect("date");
        assert_eq!(FixedClock::on(date).today(), date);
    }
}
