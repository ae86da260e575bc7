//! Device proxies — one per physical device, caching its latest record.
//!
//! A proxy is created once from the discovery catalog and lives as long as
//! the process. Its cached [`Snapshot`] is replaced wholesale, either by the
//! reconciliation loop through [`Reconcile::merge`] or by the refresh that
//! follows every command. Reads never touch the network.
//!
//! Per-kind operations live in [`switch`] (lights and relays) and [`climate`]
//! (thermo zones). Sensors are read-only.

pub mod climate;
pub mod switch;

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use domosync_domain::category::Category;
use domosync_domain::command::HubCommand;
use domosync_domain::error::DomoError;
use domosync_domain::id::DeviceKey;
use domosync_domain::record::{
    Catalog, CatalogRecord, LightRecord, RelayRecord, SensorRecord, ThermoRecord, Timestamp,
};

use crate::ports::HubTransport;
use crate::reconciler::MissingPolicy;
use crate::services::catalog_fetcher::CatalogFetcher;

pub use climate::ClimateCommand;
pub use switch::{SwitchCommand, Switchable};

/// Cached state of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<R> {
    /// Latest record matched for the device.
    pub record: R,
    /// Cleared when the device was absent from a fetch under
    /// [`MissingPolicy::MarkUnavailable`].
    pub available: bool,
    /// When the catalog the record came from was fetched.
    pub refreshed_at: Timestamp,
}

/// What a merge did to a proxy's cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Updated,
    Unchanged,
    Missing,
}

/// Read access to a proxy's cached state.
pub trait Readable {
    type Record: CatalogRecord;

    /// Stable identifier derived from the hub naming at discovery.
    fn unique_id(&self) -> &str;

    /// Last cached snapshot. No hub traffic.
    fn read(&self) -> Snapshot<Self::Record>;
}

/// Merge target of the reconciliation loop.
pub trait Reconcile: Send + Sync {
    fn key(&self) -> DeviceKey;

    fn category(&self) -> Category {
        self.key().category()
    }

    /// Replace the cached snapshot with the matching record of `catalog`, or
    /// apply the missing-record policy when there is none.
    fn merge(&self, catalog: &Catalog) -> MergeOutcome;
}

/// A proxy accepting per-kind commands.
///
/// Every command is followed by a refresh of the device's category; the
/// command only succeeds if that refresh does.
pub trait Commandable: Readable {
    type Command: Send;

    /// Issue `command`, then refresh.
    ///
    /// # Errors
    ///
    /// [`DomoError::Validation`] for rejected arguments (nothing is sent),
    /// otherwise any error of the command exchange or the refresh.
    fn command(
        &self,
        command: Self::Command,
    ) -> impl Future<Output = Result<Snapshot<Self::Record>, DomoError>> + Send;
}

/// One remote device.
pub struct DeviceProxy<T, R> {
    fetcher: CatalogFetcher<T>,
    key: DeviceKey,
    unique_id: String,
    policy: MissingPolicy,
    state: RwLock<Snapshot<R>>,
}

pub type LightProxy<T> = DeviceProxy<T, LightRecord>;
pub type SwitchProxy<T> = DeviceProxy<T, RelayRecord>;
pub type ClimateProxy<T> = DeviceProxy<T, ThermoRecord>;
pub type SensorProxy<T> = DeviceProxy<T, SensorRecord>;

impl<T, R> DeviceProxy<T, R>
where
    T: HubTransport,
    R: CatalogRecord,
{
    /// Build a proxy from a record of the discovery catalog.
    #[must_use]
    pub fn new(
        fetcher: CatalogFetcher<T>,
        record: R,
        refreshed_at: Timestamp,
        policy: MissingPolicy,
    ) -> Self {
        Self {
            fetcher,
            key: record.key(),
            unique_id: record.unique_id(),
            policy,
            state: RwLock::new(Snapshot {
                record,
                available: true,
                refreshed_at,
            }),
        }
    }

    #[must_use]
    pub fn key(&self) -> DeviceKey {
        self.key
    }

    /// Whether the last merge found the device (always `true` under
    /// [`MissingPolicy::Keep`]).
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.snapshot().available
    }

    /// Fetch the device's category and merge the result into this proxy and
    /// every sibling subscribed to the fetcher.
    ///
    /// # Errors
    ///
    /// Any error of the fetch; the cached state is left untouched.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub async fn refresh(&self) -> Result<Snapshot<R>, DomoError> {
        self.fetch_category().await?;
        Ok(self.snapshot())
    }

    async fn fetch_category(&self) -> Result<Catalog, DomoError> {
        let catalog = self.fetcher.fetch(R::CATEGORY).await?;
        let siblings = self.fetcher.publish(&catalog);
        tracing::trace!(siblings, "published catalog");
        self.merge_catalog(&catalog);
        Ok(catalog)
    }

    /// Send `commands` as one exchange, then refresh.
    async fn dispatch(&self, commands: &[HubCommand]) -> Result<Snapshot<R>, DomoError> {
        self.fetcher.session().execute(commands).await?;
        self.refresh().await
    }

    fn snapshot(&self) -> Snapshot<R> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn merge_catalog(&self, catalog: &Catalog) -> MergeOutcome {
        if catalog.category != R::CATEGORY {
            return MergeOutcome::Unchanged;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = catalog.find::<R>(&self.key) {
            let changed = !state.available || state.record != *record;
            *state = Snapshot {
                record: record.clone(),
                available: true,
                refreshed_at: catalog.fetched_at,
            };
            return if changed {
                MergeOutcome::Updated
            } else {
                MergeOutcome::Unchanged
            };
        }

        match self.policy {
            MissingPolicy::Keep => {}
            MissingPolicy::MarkUnavailable => state.available = false,
        }
        tracing::debug!(key = %self.key, policy = ?self.policy, "device missing from catalog");
        MergeOutcome::Missing
    }
}

impl<T, R> Readable for DeviceProxy<T, R>
where
    T: HubTransport,
    R: CatalogRecord,
{
    type Record = R;

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn read(&self) -> Snapshot<R> {
        self.snapshot()
    }
}

impl<T, R> Reconcile for DeviceProxy<T, R>
where
    T: HubTransport,
    R: CatalogRecord,
{
    fn key(&self) -> DeviceKey {
        self.key
    }

    fn merge(&self, catalog: &Catalog) -> MergeOutcome {
        self.merge_catalog(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use domosync_domain::id::RemoteId;
    use domosync_domain::record::DeviceRecord;
    use serde_json::json;

    use super::*;
    use crate::services::session_manager::{SessionManager, SessionOptions};
    use crate::testing::{FakeHub, credentials, relay_json};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn relay(id: u32, name: &str, on: bool) -> RelayRecord {
        RelayRecord {
            remote_id: RemoteId::new(id),
            name: name.to_string(),
            on,
        }
    }

    fn relays(records: Vec<RelayRecord>, fetched_at: Timestamp) -> Catalog {
        Catalog {
            category: Category::Relay,
            records: records.into_iter().map(DeviceRecord::Relay).collect(),
            fetched_at,
        }
    }

    async fn proxy(hub: &FakeHub, policy: MissingPolicy) -> SwitchProxy<FakeHub> {
        let session = SessionManager::connect(hub.clone(), credentials(), SessionOptions::default())
            .await
            .unwrap();
        let fetcher = CatalogFetcher::new(Arc::new(session));
        DeviceProxy::new(fetcher, relay(1, "Kitchen", true), at(0), policy)
    }

    #[tokio::test]
    async fn should_expose_key_and_unique_id_from_discovery_record() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::Keep).await;
        assert_eq!(
            proxy.key(),
            DeviceKey::Relay {
                remote_id: RemoteId::new(1)
            }
        );
        assert_eq!(proxy.unique_id(), "switch.kitchen_1");
        assert_eq!(proxy.category(), Category::Relay);
    }

    #[tokio::test]
    async fn should_read_without_hub_traffic() {
        let hub = FakeHub::new();
        let proxy = proxy(&hub, MissingPolicy::Keep).await;
        hub.clear_calls();

        let snapshot = proxy.read();

        assert!(snapshot.record.on);
        assert!(snapshot.available);
        assert!(hub.calls().is_empty());
    }

    #[tokio::test]
    async fn should_replace_whole_snapshot_on_match() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::Keep).await;

        let outcome = proxy.merge(&relays(vec![relay(1, "Kitchen Main", false)], at(10)));

        assert_eq!(outcome, MergeOutcome::Updated);
        let snapshot = proxy.read();
        assert_eq!(snapshot.record, relay(1, "Kitchen Main", false));
        assert_eq!(snapshot.refreshed_at, at(10));
    }

    #[tokio::test]
    async fn should_match_by_key_not_position() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::Keep).await;

        proxy.merge(&relays(
            vec![relay(2, "Garage", true), relay(1, "Kitchen", false)],
            at(10),
        ));

        assert!(!proxy.read().record.on);
    }

    #[tokio::test]
    async fn should_be_idempotent_on_identical_catalogs() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::Keep).await;
        let catalog = relays(vec![relay(1, "Kitchen", false)], at(10));

        assert_eq!(proxy.merge(&catalog), MergeOutcome::Updated);
        let first = proxy.read();
        assert_eq!(proxy.merge(&catalog), MergeOutcome::Unchanged);
        assert_eq!(proxy.read(), first);
    }

    #[tokio::test]
    async fn should_keep_state_when_missing_under_keep_policy() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::Keep).await;
        let before = proxy.read();

        let outcome = proxy.merge(&relays(vec![relay(2, "Garage", false)], at(10)));

        assert_eq!(outcome, MergeOutcome::Missing);
        assert_eq!(proxy.read(), before);
    }

    #[tokio::test]
    async fn should_clear_and_restore_availability_under_mark_policy() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::MarkUnavailable).await;

        proxy.merge(&relays(vec![], at(10)));
        let missing = proxy.read();
        assert!(!missing.available);
        assert!(missing.record.on);
        assert_eq!(missing.refreshed_at, at(0));

        proxy.merge(&relays(vec![relay(1, "Kitchen", true)], at(20)));
        assert!(proxy.is_available());
    }

    #[tokio::test]
    async fn should_ignore_catalog_of_other_category() {
        let proxy = proxy(&FakeHub::new(), MissingPolicy::MarkUnavailable).await;
        let catalog = Catalog {
            category: Category::Sensor,
            records: vec![],
            fetched_at: at(10),
        };

        assert_eq!(proxy.merge(&catalog), MergeOutcome::Unchanged);
        assert!(proxy.is_available());
    }

    #[tokio::test]
    async fn should_refresh_from_hub() {
        let hub = FakeHub::new();
        hub.push_list(Category::Relay, json!([relay_json(1, "Kitchen", false)]));
        let proxy = proxy(&hub, MissingPolicy::Keep).await;

        let snapshot = proxy.refresh().await.unwrap();

        assert!(!snapshot.record.on);
        assert_eq!(proxy.read(), snapshot);
    }

    #[tokio::test]
    async fn should_leave_state_untouched_when_refresh_fails() {
        let hub = FakeHub::new();
        hub.push_raw_list(Category::Relay, json!({ "bogus": [] }));
        let proxy = proxy(&hub, MissingPolicy::MarkUnavailable).await;
        let before = proxy.read();

        let result = proxy.refresh().await;

        assert!(matches!(result, Err(DomoError::Protocol(_))));
        assert_eq!(proxy.read(), before);
    }
}
