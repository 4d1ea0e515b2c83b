//! Cluster lifecycle controller
//!
//! One entry point per verb: create, update, delete (cluster or single
//! compute pool), describe and list. Each operation is a short-lived
//! workflow that runs to completion in the calling context; there is no
//! background supervisor. The controller owns ordering (master before
//! compute), per-pool failure aggregation and call deadlines, and drives
//! everything through the [`CloudProvider`] contract so orchestration logic
//! stays independent of any particular cloud API.
//!
//! # Failure semantics
//!
//! Validation failures never reach the provider. During a multi-pool
//! create, each compute pool succeeds or fails on its own: one pool's
//! failure neither rolls back the master pool nor cancels its siblings, and
//! the caller gets a per-pool outcome list to retry just the failed subset.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tracing::{info, warn};

use crate::assets::AssetBundle;
use crate::provider::{ClusterSummary, CloudProvider, ObservedClusterState};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::spec::{ClusterSpec, PoolRole, MASTER_POOL_NAME};
use crate::userdata;
use crate::{Error, Result};

/// Default deadline for a single cloud provider call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of provisioning one compute pool during create
#[derive(Debug)]
pub struct PoolOutcome {
    /// Pool name
    pub name: String,
    /// The failure, if the pool was not provisioned
    pub error: Option<Error>,
}

impl PoolOutcome {
    fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    fn failed(name: impl Into<String>, error: Error) -> Self {
        Self {
            name: name.into(),
            error: Some(error),
        }
    }

    /// Whether the pool was provisioned
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a create operation: the aggregate observed state plus one
/// outcome per declared compute pool.
///
/// A partially failed create leaves the cluster in a state like "master
/// ready, pool x failed, pool y ready"; the caller inspects the outcomes
/// and retries the failed pools individually.
#[derive(Debug)]
pub struct CreateOutcome {
    /// Observed state of the master pool and every successfully created
    /// compute pool
    pub state: ObservedClusterState,
    /// Per-pool outcomes, in pool name order; empty when the spec declared
    /// no compute pools
    pub pools: Vec<PoolOutcome>,
}

impl CreateOutcome {
    /// Whether every declared compute pool was provisioned
    pub fn is_complete(&self) -> bool {
        self.pools.iter().all(PoolOutcome::succeeded)
    }

    /// Outcomes of the pools that failed
    pub fn failed_pools(&self) -> impl Iterator<Item = &PoolOutcome> {
        self.pools.iter().filter(|p| !p.succeeded())
    }
}

/// Orchestrates cluster lifecycle workflows against one resolved provider.
///
/// Holds no mutable state of its own; every invocation works on the specs
/// it is handed and on fresh provider snapshots, so a controller is safe to
/// share across concurrent operations.
pub struct Controller {
    cloud: Arc<dyn CloudProvider>,
    retry: RetryConfig,
    call_timeout: Duration,
}

impl Controller {
    /// Create a controller for the given provider with no internal retries
    /// and the default per-call deadline.
    pub fn new(cloud: Arc<dyn CloudProvider>) -> Self {
        Self {
            cloud,
            retry: RetryConfig::none(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Inject a retry policy for transient provider failures
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound every provider call by the given deadline
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Create a cluster: master pool first, then all declared compute pools
    /// concurrently.
    ///
    /// A master pool failure aborts the whole operation; compute pool
    /// failures are collected per pool and returned alongside the partial
    /// success. Call [`describe`](Self::describe) afterwards to confirm the
    /// actual cloud state before retrying.
    pub async fn create(&self, spec: &ClusterSpec, assets: &AssetBundle) -> Result<CreateOutcome> {
        spec.validate()?;
        self.check_provider(spec)?;

        let defaults = self
            .call("provider defaults", || self.cloud.resolve_defaults())
            .await?;
        let mut spec = spec.clone();
        spec.apply_defaults(&defaults);

        info!(cluster = %spec.name, pools = spec.compute_pools.len(), "creating cluster");

        let master_data = userdata::generate_master(&spec, &spec.master_pool, assets)?;
        let master_resource = format!("master pool of cluster {:?}", spec.name);
        let mut state = self
            .call(&master_resource, || {
                self.cloud.create_master_pool(&spec, &master_data)
            })
            .await?;

        if spec.compute_pools.is_empty() {
            return Ok(CreateOutcome {
                state,
                pools: Vec::new(),
            });
        }

        // Compute nodes register against the master endpoint, which only
        // exists now that the master pool does.
        let endpoint = state.endpoint.clone().ok_or_else(|| {
            Error::provider(format!(
                "master pool of cluster {:?} reported no endpoint",
                spec.name
            ))
        })?;

        // One task per pool; pools share no mutable state, so they run
        // concurrently, and join_all waits for every sibling no matter how
        // the others fare.
        let tasks = spec.compute_pools.values().map(|pool| {
            let spec = &spec;
            let endpoint = endpoint.as_str();
            async move {
                let result = self.provision_compute_pool(spec, &pool.name, assets, endpoint).await;
                (pool.name.clone(), result)
            }
        });

        let mut outcomes = Vec::with_capacity(spec.compute_pools.len());
        for (name, result) in future::join_all(tasks).await {
            match result {
                Ok(mut observed) => {
                    if let Some(pool_state) = observed.compute_pools.remove(&name) {
                        state.compute_pools.insert(name.clone(), pool_state);
                    }
                    outcomes.push(PoolOutcome::ok(name));
                }
                Err(error) => {
                    warn!(cluster = %spec.name, pool = %name, error = %error, "compute pool failed");
                    outcomes.push(PoolOutcome::failed(name, error));
                }
            }
        }

        let outcome = CreateOutcome {
            state,
            pools: outcomes,
        };
        info!(
            cluster = %spec.name,
            failed = outcome.failed_pools().count(),
            "create finished"
        );
        Ok(outcome)
    }

    /// Generate userdata and provision a single compute pool
    async fn provision_compute_pool(
        &self,
        spec: &ClusterSpec,
        pool_name: &str,
        assets: &AssetBundle,
        master_endpoint: &str,
    ) -> Result<ObservedClusterState> {
        // Pool names were validated against the spec map already
        let pool = spec
            .compute_pools
            .get(pool_name)
            .ok_or_else(|| Error::not_found(format!("compute pool {pool_name:?}")))?;
        let data = userdata::generate_compute(spec, pool, assets, master_endpoint)?;
        let resource = format!("compute pool {:?} of cluster {:?}", pool.name, spec.name);
        self.call(&resource, || {
            self.cloud.create_compute_pool(&spec.name, pool, &data)
        })
        .await
    }

    /// Update one named pool of an existing cluster.
    ///
    /// Immutable fields are rejected before anything mutates. The cloud
    /// provider name and pool roles are checked locally, with no provider
    /// call at all. The `internal` flag can only be compared against
    /// observed state, so that check rides on the read-only describe this
    /// operation performs anyway; a rejection is never preceded by a
    /// mutation.
    pub async fn update(
        &self,
        spec: &ClusterSpec,
        pool_name: &str,
    ) -> Result<ObservedClusterState> {
        spec.validate()?;
        self.check_provider(spec)?;

        let pool = if pool_name == MASTER_POOL_NAME {
            &spec.master_pool
        } else {
            spec.compute_pools.get(pool_name).ok_or_else(|| {
                Error::invalid_spec(format!(
                    "pool {pool_name:?} is not declared in the spec for cluster {:?}",
                    spec.name
                ))
            })?
        };

        let observed = self.describe(&spec.name).await?;
        if observed.internal != spec.internal {
            return Err(Error::invalid_spec(format!(
                "internal is immutable: cluster {:?} was created with internal={}",
                spec.name, observed.internal
            )));
        }
        if pool.role == PoolRole::Compute && !observed.compute_pools.contains_key(pool_name) {
            return Err(Error::not_found(format!(
                "compute pool {pool_name:?} in cluster {:?}",
                spec.name
            )));
        }

        info!(cluster = %spec.name, pool = %pool_name, size = pool.size, "updating pool");
        let resource = format!("pool {:?} of cluster {:?}", pool_name, spec.name);
        self.call(&resource, || self.cloud.update_pool(&spec.name, pool))
            .await
    }

    /// Delete a whole cluster: master pool, compute pools and every
    /// cluster-owned network or DNS resource.
    pub async fn delete_cluster(&self, cluster_name: &str) -> Result<()> {
        // Existence check; a missing cluster stops here with NotFound
        self.describe(cluster_name).await?;

        info!(cluster = %cluster_name, "deleting cluster");
        let resource = format!("cluster {cluster_name:?}");
        self.call(&resource, || self.cloud.delete_cluster(cluster_name))
            .await
    }

    /// Delete a single compute pool.
    ///
    /// The master pool cannot be deleted individually; deleting it means
    /// deleting the cluster, which only
    /// [`delete_cluster`](Self::delete_cluster) does.
    pub async fn delete_pool(&self, cluster_name: &str, pool_name: &str) -> Result<()> {
        if pool_name == MASTER_POOL_NAME {
            return Err(Error::invalid_spec(format!(
                "master pool cannot be deleted individually; delete cluster {cluster_name:?} instead"
            )));
        }

        let observed = self.describe(cluster_name).await?;
        if !observed.compute_pools.contains_key(pool_name) {
            return Err(Error::not_found(format!(
                "compute pool {pool_name:?} in cluster {cluster_name:?}"
            )));
        }

        info!(cluster = %cluster_name, pool = %pool_name, "deleting compute pool");
        let resource = format!("compute pool {pool_name:?} of cluster {cluster_name:?}");
        self.call(&resource, || {
            self.cloud.delete_compute_pool(cluster_name, pool_name)
        })
        .await
    }

    /// Snapshot the observed state of a cluster. Read-only.
    pub async fn describe(&self, cluster_name: &str) -> Result<ObservedClusterState> {
        let resource = format!("cluster {cluster_name:?}");
        self.call(&resource, || self.cloud.describe_cluster(cluster_name))
            .await
    }

    /// Summaries of all clusters the provider knows about. Read-only.
    pub async fn list(&self) -> Result<Vec<ClusterSummary>> {
        self.call("cluster list", || self.cloud.list_clusters())
            .await
    }

    /// The spec must name the provider this controller was built with;
    /// `cloudProvider` is set at creation and never mutated.
    fn check_provider(&self, spec: &ClusterSpec) -> Result<()> {
        if spec.cloud_provider != self.cloud.name() {
            return Err(Error::invalid_spec(format!(
                "cloud provider is immutable: this controller manages {:?}, spec names {:?}",
                self.cloud.name(),
                spec.cloud_provider
            )));
        }
        Ok(())
    }

    /// Run one provider call under the deadline and retry policy.
    ///
    /// A timeout reports which resource was in flight without assuming the
    /// cloud mutation did or did not take effect.
    async fn call<T, F, Fut>(&self, resource: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        retry_with_backoff(&self.retry, resource, Error::is_retryable, || {
            let fut = op();
            async move {
                match tokio::time::timeout(self.call_timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(resource)),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use crate::provider::{MockCloudProvider, PoolState, ProviderDefaults};
    use crate::spec::PoolSpec;
    use std::collections::BTreeMap;

    // =========================================================================
    // Test Fixtures
    // =========================================================================

    const PROVIDER: &str = "fake";

    fn full_bundle() -> AssetBundle {
        let mut bundle = AssetBundle::new();
        for kind in AssetKind::all() {
            bundle = bundle.with(kind, format!("material for {kind}").into_bytes());
        }
        bundle
    }

    fn sample_spec() -> ClusterSpec {
        ClusterSpec::new("demo", PROVIDER, PoolSpec::master(3))
            .with_compute_pool(PoolSpec::new("default", PoolRole::Compute, 2))
    }

    fn master_state(cluster: &str, size: u32) -> ObservedClusterState {
        ObservedClusterState {
            cluster_name: cluster.to_string(),
            cloud_provider: PROVIDER.to_string(),
            internal: false,
            endpoint: Some("10.0.0.1:6443".to_string()),
            master_pool: PoolState {
                name: MASTER_POOL_NAME.to_string(),
                role: PoolRole::Master,
                size,
                healthy: size,
                kube_version: None,
                addresses: Vec::new(),
            },
            compute_pools: BTreeMap::new(),
        }
    }

    fn pool_state(name: &str, size: u32) -> PoolState {
        PoolState {
            name: name.to_string(),
            role: PoolRole::Compute,
            size,
            healthy: size,
            kube_version: None,
            addresses: Vec::new(),
        }
    }

    fn state_with_pool(cluster: &str, pool: &str, size: u32) -> ObservedClusterState {
        let mut state = master_state(cluster, 3);
        state.compute_pools.insert(pool.to_string(), pool_state(pool, size));
        state
    }

    fn mock() -> MockCloudProvider {
        let mut mock = MockCloudProvider::new();
        mock.expect_name().return_const(PROVIDER.to_string());
        mock
    }

    fn mock_with_defaults() -> MockCloudProvider {
        let mut mock = mock();
        mock.expect_resolve_defaults()
            .returning(|| Ok(ProviderDefaults::default()));
        mock
    }

    fn controller(mock: MockCloudProvider) -> Controller {
        Controller::new(Arc::new(mock))
    }

    // =========================================================================
    // Create Stories
    // =========================================================================

    /// Story: A full create provisions the master, then every compute pool
    #[tokio::test]
    async fn story_create_provisions_master_then_compute() {
        let mut mock = mock_with_defaults();
        mock.expect_create_master_pool()
            .withf(|spec, data| spec.name == "demo" && data.starts_with(b"#cloud-config"))
            .times(1)
            .returning(|spec, _| Ok(master_state(&spec.name, spec.master_pool.size)));
        mock.expect_create_compute_pool()
            .withf(|cluster, pool, data| {
                cluster == "demo" && pool.name == "default" && data.starts_with(b"#cloud-config")
            })
            .times(1)
            .returning(|cluster, pool, _| Ok(state_with_pool(cluster, &pool.name, pool.size)));

        let outcome = controller(mock)
            .create(&sample_spec(), &full_bundle())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.state.master_pool.size, 3);
        assert_eq!(outcome.state.compute_pools["default"].size, 2);
    }

    /// Story: Create with zero compute pools never touches compute provisioning
    #[tokio::test]
    async fn story_create_without_compute_pools_skips_compute_calls() {
        let mut mock = mock_with_defaults();
        mock.expect_create_master_pool()
            .times(1)
            .returning(|spec, _| Ok(master_state(&spec.name, spec.master_pool.size)));
        // No create_compute_pool expectation: any call would panic

        let spec = ClusterSpec::new("demo", PROVIDER, PoolSpec::master(3));
        let outcome = controller(mock).create(&spec, &full_bundle()).await.unwrap();

        assert!(outcome.pools.is_empty());
        assert!(outcome.is_complete());
    }

    /// Story: An invalid spec is rejected before any provider call
    #[tokio::test]
    async fn story_create_validation_precedes_provider_calls() {
        // No expectations at all: validation must fail first
        let mock = MockCloudProvider::new();

        let spec = ClusterSpec::new("", PROVIDER, PoolSpec::master(3));
        let err = controller(mock)
            .create(&spec, &full_bundle())
            .await
            .expect_err("empty name");
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    /// Story: A spec naming a different provider is rejected locally
    #[tokio::test]
    async fn story_create_rejects_foreign_provider_spec() {
        let mock = mock(); // only name() may be called

        let spec = ClusterSpec::new("demo", "other-cloud", PoolSpec::master(3));
        let err = controller(mock)
            .create(&spec, &full_bundle())
            .await
            .expect_err("wrong provider");
        assert!(matches!(err, Error::InvalidSpec(_)));
        assert!(err.to_string().contains("immutable"));
    }

    /// Story: Master pool failure aborts before any compute pool is attempted
    #[tokio::test]
    async fn story_master_failure_aborts_compute_provisioning() {
        let mut mock = mock_with_defaults();
        mock.expect_create_master_pool()
            .times(1)
            .returning(|_, _| Err(Error::provider("subnet exhausted")));
        // No compute expectation: master-before-compute ordering

        let err = controller(mock)
            .create(&sample_spec(), &full_bundle())
            .await
            .expect_err("master failed");
        assert!(matches!(err, Error::Provider(_)));
    }

    /// Story: One failing pool is reported per-pool, siblings are unaffected
    #[tokio::test]
    async fn story_partial_compute_failure_is_aggregated() {
        let spec = ClusterSpec::new("demo", PROVIDER, PoolSpec::master(3))
            .with_compute_pool(PoolSpec::new("batch", PoolRole::Compute, 4))
            .with_compute_pool(PoolSpec::new("default", PoolRole::Compute, 2))
            .with_compute_pool(PoolSpec::new("gpu", PoolRole::Compute, 1));

        let mut mock = mock_with_defaults();
        mock.expect_create_master_pool()
            .times(1)
            .returning(|spec, _| Ok(master_state(&spec.name, spec.master_pool.size)));
        mock.expect_create_compute_pool()
            .times(3)
            .returning(|cluster, pool, _| {
                if pool.name == "batch" {
                    Err(Error::provider("quota exceeded"))
                } else {
                    Ok(state_with_pool(cluster, &pool.name, pool.size))
                }
            });

        let outcome = controller(mock).create(&spec, &full_bundle()).await.unwrap();

        assert!(!outcome.is_complete());
        let failed: Vec<&str> = outcome.failed_pools().map(|p| p.name.as_str()).collect();
        assert_eq!(failed, vec!["batch"]);
        assert_eq!(outcome.pools.len(), 3);
        assert!(outcome.state.compute_pools.contains_key("default"));
        assert!(outcome.state.compute_pools.contains_key("gpu"));
        assert!(!outcome.state.compute_pools.contains_key("batch"));
        assert_eq!(outcome.state.master_pool.size, 3);
    }

    /// Story: Missing assets fail generation before the cloud sees anything
    #[tokio::test]
    async fn story_create_fails_on_missing_assets_without_mutation() {
        let mut mock = mock();
        mock.expect_resolve_defaults()
            .returning(|| Ok(ProviderDefaults::default()));
        // No create expectations: generation fails first

        let err = controller(mock)
            .create(&sample_spec(), &AssetBundle::new())
            .await
            .expect_err("empty bundle");
        assert!(matches!(err, Error::MissingAsset(_)));
    }

    /// Story: A master pool without an endpoint cannot feed compute pools
    #[tokio::test]
    async fn story_create_requires_master_endpoint_for_compute() {
        let mut mock = mock_with_defaults();
        mock.expect_create_master_pool().times(1).returning(|spec, _| {
            let mut state = master_state(&spec.name, spec.master_pool.size);
            state.endpoint = None;
            Ok(state)
        });

        let err = controller(mock)
            .create(&sample_spec(), &full_bundle())
            .await
            .expect_err("no endpoint");
        assert!(err.to_string().contains("no endpoint"));
    }

    // =========================================================================
    // Update Stories
    // =========================================================================

    /// Story: Updating a pool delegates to the provider after checks pass
    #[tokio::test]
    async fn story_update_delegates_to_provider() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Ok(state_with_pool(name, "default", 2)));
        mock.expect_update_pool()
            .withf(|cluster, pool| cluster == "demo" && pool.size == 5)
            .times(1)
            .returning(|cluster, pool| Ok(state_with_pool(cluster, &pool.name, pool.size)));

        let mut spec = sample_spec();
        spec.compute_pools.get_mut("default").unwrap().size = 5;
        let state = controller(mock).update(&spec, "default").await.unwrap();
        assert_eq!(state.compute_pools["default"].size, 5);
    }

    /// Story: Flipping the internal flag is rejected after one read-only call
    #[tokio::test]
    async fn story_update_rejects_internal_flip() {
        let mut mock = mock();
        mock.expect_describe_cluster().times(1).returning(|name| {
            let mut state = state_with_pool(name, "default", 2);
            state.internal = true;
            Ok(state)
        });
        // No update_pool expectation

        let err = controller(mock)
            .update(&sample_spec(), "default")
            .await
            .expect_err("internal changed");
        assert!(matches!(err, Error::InvalidSpec(_)));
        assert!(err.to_string().contains("internal is immutable"));
    }

    /// Story: A provider change is rejected without any provider call
    #[tokio::test]
    async fn story_update_rejects_provider_change_locally() {
        let mock = mock(); // describe_cluster would panic

        let mut spec = sample_spec();
        spec.cloud_provider = "other-cloud".into();
        let err = controller(mock)
            .update(&spec, "default")
            .await
            .expect_err("provider changed");
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    /// Story: Updating a pool the cloud has never seen reports NotFound
    #[tokio::test]
    async fn story_update_missing_pool_is_not_found() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Ok(master_state(name, 3)));

        let err = controller(mock)
            .update(&sample_spec(), "default")
            .await
            .expect_err("pool absent");
        assert!(matches!(err, Error::NotFound(_)));
    }

    // =========================================================================
    // Delete Stories
    // =========================================================================

    /// Story: Deleting a missing cluster stops at the existence check
    #[tokio::test]
    async fn story_delete_missing_cluster_is_not_found() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Err(Error::not_found(format!("cluster {name:?}"))));
        // No delete_cluster expectation

        let err = controller(mock)
            .delete_cluster("ghost")
            .await
            .expect_err("missing");
        assert!(matches!(err, Error::NotFound(_)));
    }

    /// Story: Cluster delete removes everything through one provider call
    #[tokio::test]
    async fn story_delete_cluster_after_existence_check() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Ok(master_state(name, 3)));
        mock.expect_delete_cluster()
            .withf(|name| name == "demo")
            .times(1)
            .returning(|_| Ok(()));

        controller(mock).delete_cluster("demo").await.unwrap();
    }

    /// Story: The master pool can only go down with the whole cluster
    #[tokio::test]
    async fn story_delete_master_pool_individually_is_rejected() {
        let mock = mock(); // no provider call may happen

        let err = controller(mock)
            .delete_pool("demo", MASTER_POOL_NAME)
            .await
            .expect_err("master pool");
        assert!(matches!(err, Error::InvalidSpec(_)));
        assert!(err.to_string().contains("delete cluster"));
    }

    /// Story: Deleting one compute pool leaves the rest of the cluster alone
    #[tokio::test]
    async fn story_delete_compute_pool_only_touches_that_pool() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Ok(state_with_pool(name, "default", 2)));
        mock.expect_delete_compute_pool()
            .withf(|cluster, pool| cluster == "demo" && pool == "default")
            .times(1)
            .returning(|_, _| Ok(()));

        controller(mock).delete_pool("demo", "default").await.unwrap();
    }

    /// Story: Deleting an absent compute pool reports NotFound
    #[tokio::test]
    async fn story_delete_absent_compute_pool_is_not_found() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Ok(master_state(name, 3)));

        let err = controller(mock)
            .delete_pool("demo", "default")
            .await
            .expect_err("absent");
        assert!(matches!(err, Error::NotFound(_)));
    }

    // =========================================================================
    // Deadline Stories
    // =========================================================================

    /// Slow provider used to exercise call deadlines; mockall expectations
    /// return synchronously, so a bespoke fake holds the sleep.
    struct SlowCloud;

    #[async_trait::async_trait]
    impl CloudProvider for SlowCloud {
        fn name(&self) -> &str {
            PROVIDER
        }

        async fn resolve_defaults(&self) -> Result<ProviderDefaults> {
            Ok(ProviderDefaults::default())
        }

        async fn create_master_pool(
            &self,
            _spec: &ClusterSpec,
            _user_data: &[u8],
        ) -> Result<ObservedClusterState> {
            unimplemented!("not exercised")
        }

        async fn create_compute_pool(
            &self,
            _cluster_name: &str,
            _pool: &PoolSpec,
            _user_data: &[u8],
        ) -> Result<ObservedClusterState> {
            unimplemented!("not exercised")
        }

        async fn update_pool(
            &self,
            _cluster_name: &str,
            _pool: &PoolSpec,
        ) -> Result<ObservedClusterState> {
            unimplemented!("not exercised")
        }

        async fn delete_compute_pool(&self, _cluster_name: &str, _pool_name: &str) -> Result<()> {
            unimplemented!("not exercised")
        }

        async fn delete_cluster(&self, _cluster_name: &str) -> Result<()> {
            unimplemented!("not exercised")
        }

        async fn describe_cluster(&self, cluster_name: &str) -> Result<ObservedClusterState> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(master_state(cluster_name, 3))
        }

        async fn list_clusters(&self) -> Result<Vec<ClusterSummary>> {
            unimplemented!("not exercised")
        }
    }

    /// Story: A stalled provider call reports Timeout naming the resource
    #[tokio::test(start_paused = true)]
    async fn story_stalled_call_times_out_with_resource_name() {
        let controller =
            Controller::new(Arc::new(SlowCloud)).with_call_timeout(Duration::from_secs(5));

        let err = controller.describe("demo").await.expect_err("stalled");
        match err {
            Error::Timeout(resource) => assert!(resource.contains("demo")),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    /// Story: An injected retry policy retries transient failures only
    #[tokio::test]
    async fn story_injected_retry_policy_recovers_transient_failure() {
        let mut mock = mock();
        let mut calls = 0u32;
        mock.expect_describe_cluster()
            .times(2)
            .returning(move |name| {
                calls += 1;
                if calls == 1 {
                    Err(Error::provider("connection reset"))
                } else {
                    Ok(master_state(name, 3))
                }
            });

        let controller = Controller::new(Arc::new(mock)).with_retry(RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        });

        let state = controller.describe("demo").await.unwrap();
        assert_eq!(state.master_pool.size, 3);
    }

    /// Story: Semantic answers are never retried, even with a policy
    #[tokio::test]
    async fn story_retry_policy_leaves_semantic_errors_alone() {
        let mut mock = mock();
        mock.expect_describe_cluster()
            .times(1)
            .returning(|name| Err(Error::not_found(format!("cluster {name:?}"))));

        let controller =
            Controller::new(Arc::new(mock)).with_retry(RetryConfig::with_max_attempts(5));

        let err = controller.describe("ghost").await.expect_err("missing");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
