//! Reconciliation loop — periodic catalog refresh merged into every proxy.
//!
//! Each tick fetches every category that has at least one proxy exactly
//! once and merges the result into all proxies of that category. A failed
//! category is reported and skipped; the others still run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use domosync_domain::category::Category;
use domosync_domain::error::DomoError;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::ports::HubTransport;
use crate::proxy::{MergeOutcome, Reconcile};
use crate::services::catalog_fetcher::CatalogFetcher;

/// What a merge does with a proxy whose device is absent from a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Keep the last cached state untouched.
    #[default]
    Keep,
    /// Keep the last cached state but flag it as unavailable until the
    /// device shows up again.
    MarkUnavailable,
}

/// Outcome of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Categories fetched successfully.
    pub fetched: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub missing: usize,
    /// Categories whose fetch failed, with the error.
    pub failures: Vec<(Category, DomoError)>,
}

impl TickReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs reconciliation ticks over a set of proxies.
pub struct Reconciler<T> {
    fetcher: CatalogFetcher<T>,
}

impl<T> Clone for Reconciler<T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<T: HubTransport> Reconciler<T> {
    #[must_use]
    pub fn new(fetcher: CatalogFetcher<T>) -> Self {
        Self { fetcher }
    }

    /// One pass: one fetch per category present among `proxies`.
    #[tracing::instrument(skip_all, fields(proxies = proxies.len()))]
    pub async fn tick(&self, proxies: &[Arc<dyn Reconcile>]) -> TickReport {
        let categories: BTreeSet<Category> = proxies.iter().map(|p| p.category()).collect();
        let mut report = TickReport::default();

        for category in categories {
            let catalog = match self.fetcher.fetch(category).await {
                Ok(catalog) => catalog,
                Err(err) => {
                    tracing::warn!(%category, %err, "category refresh failed");
                    report.failures.push((category, err));
                    continue;
                }
            };
            report.fetched += 1;

            for proxy in proxies.iter().filter(|p| p.category() == category) {
                match proxy.merge(&catalog) {
                    MergeOutcome::Updated => {
                        tracing::info!(key = %proxy.key(), "device state changed");
                        report.updated += 1;
                    }
                    MergeOutcome::Unchanged => report.unchanged += 1,
                    MergeOutcome::Missing => report.missing += 1,
                }
            }
        }

        tracing::debug!(
            fetched = report.fetched,
            updated = report.updated,
            missing = report.missing,
            failed = report.failures.len(),
            "reconciliation tick done"
        );
        report
    }
}

/// Background task ticking a [`Reconciler`] on a fixed interval.
pub struct Poller<T> {
    reconciler: Reconciler<T>,
    proxies: Vec<Arc<dyn Reconcile>>,
    interval: Duration,
}

impl<T: HubTransport + 'static> Poller<T> {
    /// Spawn the loop. The first tick runs one `interval` from now, since
    /// proxies are fresh from discovery.
    pub fn start(
        reconciler: Reconciler<T>,
        proxies: Vec<Arc<dyn Reconcile>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let poller = Self {
            reconciler,
            proxies,
            interval,
        };

        tokio::spawn(poller.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = self.reconciler.tick(&self.proxies).await;
            if !report.is_clean() {
                tracing::warn!(
                    failed = report.failures.len(),
                    "poll tick incomplete, retrying next interval"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use domosync_domain::command::HubCommand;
    use domosync_domain::record::{CatalogRecord, RelayRecord, ThermoRecord};
    use serde_json::json;

    use super::*;
    use crate::proxy::{ClimateProxy, DeviceProxy, Readable, SwitchProxy};
    use crate::services::session_manager::{SessionManager, SessionOptions};
    use crate::testing::{FakeHub, credentials, relay_json, zone_json};

    struct Fixture {
        hub: FakeHub,
        reconciler: Reconciler<FakeHub>,
        relays: Vec<Arc<SwitchProxy<FakeHub>>>,
        zone: Arc<ClimateProxy<FakeHub>>,
    }

    impl Fixture {
        fn proxies(&self) -> Vec<Arc<dyn Reconcile>> {
            let mut proxies: Vec<Arc<dyn Reconcile>> = self
                .relays
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn Reconcile>)
                .collect();
            proxies.push(Arc::clone(&self.zone) as Arc<dyn Reconcile>);
            proxies
        }
    }

    async fn discover<R: CatalogRecord>(
        fetcher: &CatalogFetcher<FakeHub>,
        policy: MissingPolicy,
    ) -> Vec<Arc<DeviceProxy<FakeHub, R>>> {
        let catalog = fetcher.fetch(R::CATEGORY).await.unwrap();
        catalog
            .iter::<R>()
            .map(|r| {
                Arc::new(DeviceProxy::new(
                    fetcher.clone(),
                    r.clone(),
                    catalog.fetched_at,
                    policy,
                ))
            })
            .collect()
    }

    async fn fixture(policy: MissingPolicy) -> Fixture {
        let hub = FakeHub::new();
        hub.push_list(
            Category::Relay,
            json!([relay_json(1, "Kitchen", true), relay_json(2, "Garage", false)]),
        );
        hub.push_list(
            Category::Thermo,
            json!([zone_json(3, "Living", 1, "winter", 205, 198)]),
        );
        let session = SessionManager::connect(hub.clone(), credentials(), SessionOptions::default())
            .await
            .unwrap();
        let fetcher = CatalogFetcher::new(Arc::new(session));
        let relays = discover::<RelayRecord>(&fetcher, policy).await;
        let mut zones = discover::<ThermoRecord>(&fetcher, policy).await;
        hub.clear_calls();
        Fixture {
            hub,
            reconciler: Reconciler::new(fetcher),
            relays,
            zone: zones.remove(0),
        }
    }

    #[tokio::test]
    async fn should_fetch_each_category_once_per_tick() {
        let fx = fixture(MissingPolicy::Keep).await;

        let report = fx.reconciler.tick(&fx.proxies()).await;

        assert_eq!(
            fx.hub.sends(),
            vec![
                HubCommand::List {
                    category: Category::Relay
                },
                HubCommand::List {
                    category: Category::Thermo
                },
            ]
        );
        assert_eq!(report.fetched, 2);
        assert_eq!(report.unchanged, 3);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn should_update_changed_devices() {
        let fx = fixture(MissingPolicy::Keep).await;
        fx.hub.replace_list(
            Category::Relay,
            json!([relay_json(2, "Garage", true), relay_json(1, "Kitchen", true)]),
        );

        let report = fx.reconciler.tick(&fx.proxies()).await;

        assert_eq!(report.updated, 1);
        assert!(fx.relays[1].is_on());
    }

    #[tokio::test]
    async fn should_keep_last_state_of_missing_zone() {
        let fx = fixture(MissingPolicy::Keep).await;
        let before = fx.zone.read();
        fx.hub.replace_list(Category::Thermo, json!([]));

        let report = fx.reconciler.tick(&fx.proxies()).await;

        assert_eq!(report.missing, 1);
        assert_eq!(fx.zone.read(), before);
        assert_eq!(fx.zone.read().record.setpoint.degrees(), 20.5);
    }

    #[tokio::test]
    async fn should_mark_missing_zone_unavailable_under_mark_policy() {
        let fx = fixture(MissingPolicy::MarkUnavailable).await;
        fx.hub.replace_list(Category::Thermo, json!([]));

        fx.reconciler.tick(&fx.proxies()).await;

        assert!(!fx.zone.is_available());
        assert!(fx.relays.iter().all(|r| r.is_available()));
    }

    #[tokio::test]
    async fn should_continue_with_other_categories_after_failure() {
        let fx = fixture(MissingPolicy::Keep).await;
        fx.hub.replace_raw_list(Category::Relay, json!({ "nope": 1 }));
        fx.hub.replace_list(
            Category::Thermo,
            json!([zone_json(3, "Living", 0, "winter", 205, 198)]),
        );

        let report = fx.reconciler.tick(&fx.proxies()).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, Category::Relay);
        assert!(matches!(report.failures[0].1, DomoError::Protocol(_)));
        assert_eq!(report.fetched, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(fx.zone.hvac_mode(), domosync_domain::climate::HvacMode::Off);
    }

    #[tokio::test]
    async fn should_do_nothing_without_proxies() {
        let fx = fixture(MissingPolicy::Keep).await;

        let report = fx.reconciler.tick(&[]).await;

        assert_eq!(report.fetched, 0);
        assert!(fx.hub.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_poll_on_interval() {
        let fx = fixture(MissingPolicy::Keep).await;
        let relays: Vec<Arc<dyn Reconcile>> = fx
            .relays
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn Reconcile>)
            .collect();

        let handle = Poller::start(fx.reconciler.clone(), relays, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        assert_eq!(fx.hub.sends().len(), 2);
        assert_eq!(
            fx.hub.sends()[1],
            HubCommand::List {
                category: Category::Relay
            }
        );
    }
}
