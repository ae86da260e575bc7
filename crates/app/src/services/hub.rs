//! Top-level hub service — owns the session and builds the device proxies.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use domosync_domain::error::DomoError;
use domosync_domain::record::{Catalog, CatalogRecord, HubInfo};
use tokio::task::JoinHandle;

use crate::ports::{Credentials, HubTransport};
use crate::proxy::{ClimateProxy, DeviceProxy, LightProxy, Reconcile, SensorProxy, SwitchProxy};
use crate::reconciler::{MissingPolicy, Poller, Reconciler, TickReport};
use crate::services::catalog_fetcher::CatalogFetcher;
use crate::services::session_manager::{SessionManager, SessionOptions};

/// Tunables for a [`DomoHub`].
#[derive(Debug, Clone, Default)]
pub struct HubOptions {
    pub session: SessionOptions,
    pub missing_policy: MissingPolicy,
}

/// Every proxy built by [`DomoHub::discover`], grouped by kind.
pub struct Devices<T> {
    pub lights: Vec<Arc<LightProxy<T>>>,
    pub relays: Vec<Arc<SwitchProxy<T>>>,
    pub climates: Vec<Arc<ClimateProxy<T>>>,
    pub sensors: Vec<Arc<SensorProxy<T>>>,
}

impl<T: HubTransport + 'static> Devices<T> {
    /// Every proxy as a reconciliation target.
    #[must_use]
    pub fn reconcilables(&self) -> Vec<Arc<dyn Reconcile>> {
        fn erase<P: Reconcile + 'static>(
            proxies: &[Arc<P>],
        ) -> impl Iterator<Item = Arc<dyn Reconcile>> + '_ {
            proxies.iter().map(|p| Arc::clone(p) as Arc<dyn Reconcile>)
        }

        erase(&self.lights)
            .chain(erase(&self.relays))
            .chain(erase(&self.climates))
            .chain(erase(&self.sensors))
            .collect()
    }
}

impl<T> Devices<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len() + self.relays.len() + self.climates.len() + self.sensors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The one handle to a hub: session, discovery, polling and shutdown.
pub struct DomoHub<T> {
    fetcher: CatalogFetcher<T>,
    options: HubOptions,
}

impl<T: HubTransport + 'static> DomoHub<T> {
    /// Log in to the hub.
    ///
    /// # Errors
    ///
    /// [`DomoError::Connect`] or [`DomoError::Auth`], never retried.
    pub async fn connect(
        transport: T,
        credentials: Credentials,
        options: HubOptions,
    ) -> Result<Self, DomoError> {
        let session =
            SessionManager::connect(transport, credentials, options.session.clone()).await?;
        Ok(Self {
            fetcher: CatalogFetcher::new(Arc::new(session)),
            options,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager<T>> {
        self.fetcher.session()
    }

    /// Serial number and enabled features.
    ///
    /// # Errors
    ///
    /// Any session or protocol error.
    pub async fn hub_info(&self) -> Result<HubInfo, DomoError> {
        self.fetcher.hub_info().await
    }

    /// Fetch every category once and build one proxy per device.
    ///
    /// # Errors
    ///
    /// The first failing fetch; discovery is all or nothing.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self) -> Result<Devices<T>, DomoError> {
        let devices = Devices {
            lights: self.discover_kind().await?,
            relays: self.discover_kind().await?,
            climates: self.discover_kind().await?,
            sensors: self.discover_kind().await?,
        };
        tracing::info!(
            lights = devices.lights.len(),
            relays = devices.relays.len(),
            climates = devices.climates.len(),
            sensors = devices.sensors.len(),
            "discovered devices"
        );
        Ok(devices)
    }

    /// One reconciliation pass over `devices`.
    pub async fn tick(&self, devices: &Devices<T>) -> TickReport {
        self.reconciler().tick(&devices.reconcilables()).await
    }

    /// Spawn the background poller.
    pub fn start_polling(&self, devices: &Devices<T>, interval: Duration) -> JoinHandle<()> {
        tracing::info!(interval_secs = interval.as_secs(), "starting poller");
        Poller::start(self.reconciler(), devices.reconcilables(), interval)
    }

    /// Log out. Proxies fail every later command.
    ///
    /// # Errors
    ///
    /// The transport's logout failure.
    pub async fn shutdown(&self) -> Result<(), DomoError> {
        self.session().logout().await
    }

    fn reconciler(&self) -> Reconciler<T> {
        Reconciler::new(self.fetcher.clone())
    }

    async fn discover_kind<R: CatalogRecord>(
        &self,
    ) -> Result<Vec<Arc<DeviceProxy<T, R>>>, DomoError> {
        let catalog = self.fetcher.fetch(R::CATEGORY).await?;
        Ok(self.build(&catalog))
    }

    /// One proxy per record; a repeated key keeps the first record. Each
    /// proxy is subscribed to the fetcher so command refreshes reach its
    /// siblings.
    fn build<R: CatalogRecord>(&self, catalog: &Catalog) -> Vec<Arc<DeviceProxy<T, R>>> {
        let mut seen = HashSet::new();
        catalog
            .iter::<R>()
            .filter(|record| {
                let fresh = seen.insert(record.key());
                if !fresh {
                    tracing::warn!(key = %record.key(), "duplicate device key, skipping");
                }
                fresh
            })
            .map(|record| {
                let proxy = Arc::new(DeviceProxy::new(
                    self.fetcher.clone(),
                    record.clone(),
                    catalog.fetched_at,
                    self.options.missing_policy,
                ));
                self.fetcher
                    .subscribe(&(Arc::clone(&proxy) as Arc<dyn Reconcile>));
                proxy
            })
            .collect()
    }
}
