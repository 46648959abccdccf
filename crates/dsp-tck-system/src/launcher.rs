// crates/dsp-tck-system/src/launcher.rs
// ============================================================================
// Module: DSP System Launcher
// Description: Launcher exposing DSP connectors, clients, mocks and pipelines.
// Purpose: Resolve the services a scenario needs for a given scope.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! [`DspSystemLauncher`] reads [`DspSystemConfig`] at start and afterwards
//! hands out services keyed by scope, normally the scenario id. Every scope
//! has its own consumer and provider [`TckConnector`]. In local mode the
//! connector under test is one of those connectors, scripted by local mocks;
//! otherwise HTTP clients call the remote connector and mocks are no-ops.
//! Invariants:
//! - Connectors, clients and mocks are created once per scope.
//! - Pipelines are created fresh on every request.
//! - Every accessor fails before `start`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerNegotiationMock;
use dsp_tck_api::ConsumerTransferProcessMock;
use dsp_tck_api::ProviderNegotiationMock;
use dsp_tck_api::ProviderTransferProcessMock;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::LauncherError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::PropertyError;
use dsp_tck_core::SystemConfiguration;
use dsp_tck_core::SystemLauncher;
use dsp_tck_core::TckProperties;
use tracing::debug;
use tracing::info;

use crate::client::CatalogClient;
use crate::client::ConsumerNegotiationClient;
use crate::client::ConsumerTransferProcessClient;
use crate::client::HttpCatalogClient;
use crate::client::HttpConsumerNegotiationClient;
use crate::client::HttpConsumerTransferProcessClient;
use crate::client::HttpExecutor;
use crate::client::HttpMetadataClient;
use crate::client::HttpProviderNegotiationClient;
use crate::client::HttpProviderTransferProcessClient;
use crate::client::LocalCatalogClient;
use crate::client::LocalConsumerNegotiationClient;
use crate::client::LocalConsumerTransferProcessClient;
use crate::client::LocalMetadataClient;
use crate::client::LocalProviderNegotiationClient;
use crate::client::LocalProviderTransferProcessClient;
use crate::client::MetadataClient;
use crate::client::ProviderNegotiationClient;
use crate::client::ProviderTransferProcessClient;
use crate::connector::TckConnector;
use crate::mock::ActionExecutor;
use crate::mock::LocalConsumerNegotiationMock;
use crate::mock::LocalConsumerTransferProcessMock;
use crate::mock::LocalProviderNegotiationMock;
use crate::mock::LocalProviderTransferProcessMock;
use crate::mock::NoOpConsumerNegotiationMock;
use crate::mock::NoOpConsumerTransferProcessMock;
use crate::mock::NoOpProviderNegotiationMock;
use crate::mock::NoOpProviderTransferProcessMock;
use crate::pipeline::ConsumerNegotiationPipeline;
use crate::pipeline::ConsumerTransferProcessPipeline;
use crate::pipeline::ProviderNegotiationPipeline;
use crate::pipeline::ProviderTransferProcessPipeline;

// ============================================================================
// SECTION: Configuration Keys
// ============================================================================

/// Runs against an in-process connector when true.
pub const LOCAL_CONNECTOR: &str = "dataspacetck.dsp.local.connector";
/// Participant id of the connector under test.
pub const CONNECTOR_AGENT_ID: &str = "dataspacetck.dsp.connector.agent.id";
/// DSP base URL of the connector under test.
pub const CONNECTOR_BASE_URL: &str = "dataspacetck.dsp.connector.http.url";
/// Authorization header sent with every request.
pub const CONNECTOR_AUTHORIZATION: &str = "dataspacetck.dsp.connector.http.headers.authorization";
/// URL asking the consumer under test to start a negotiation.
pub const CONNECTOR_NEGOTIATION_INITIATE_URL: &str =
    "dataspacetck.dsp.connector.negotiation.initiate.url";
/// URL asking the consumer under test to start a transfer.
pub const CONNECTOR_TRANSFER_INITIATE_URL: &str =
    "dataspacetck.dsp.connector.transfer.initiate.url";
/// Size of the mock action pool.
pub const THREAD_POOL: &str = "dataspacetck.dsp.thread.pool";
/// Upper bound, in seconds, of every pipeline wait.
pub const DEFAULT_WAIT: &str = "dataspacetck.dsp.default.wait";

/// Connector under test id used in local mode.
pub const ANONYMOUS_CONNECTOR_ID: &str = "ANONYMOUS";
/// Default size of the mock action pool.
pub const DEFAULT_THREAD_POOL: usize = 10;
/// Default pipeline wait in seconds.
pub const DEFAULT_WAIT_SECONDS: u64 = 15;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Validated launcher settings.
///
/// # Invariants
/// - When `local` is false, `connector_url`, `negotiation_initiate_url`
///   and `transfer_initiate_url` are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DspSystemConfig {
    /// Whether the connector under test runs in-process.
    pub local: bool,
    /// Participant id of the connector under test.
    pub connector_under_test_id: String,
    /// DSP base URL of the connector under test.
    pub connector_url: Option<String>,
    /// Authorization header value.
    pub authorization: Option<String>,
    /// Negotiation initiation URL of the consumer under test.
    pub negotiation_initiate_url: Option<String>,
    /// Transfer initiation URL of the consumer under test.
    pub transfer_initiate_url: Option<String>,
    /// Mock action pool size.
    pub thread_pool: usize,
    /// Upper bound of every pipeline wait.
    pub default_wait: Duration,
}

impl DspSystemConfig {
    /// Reads and validates the launcher keys.
    ///
    /// # Errors
    /// Returns [`PropertyError::Missing`] when a key required in remote mode
    /// is absent, or [`PropertyError::InvalidValue`] for malformed values.
    pub fn from_properties(properties: &TckProperties) -> Result<Self, PropertyError> {
        let local = properties.bool_or(LOCAL_CONNECTOR, false)?;
        let thread_pool = properties.parse_or(THREAD_POOL, DEFAULT_THREAD_POOL)?;
        let default_wait =
            Duration::from_secs(properties.parse_or(DEFAULT_WAIT, DEFAULT_WAIT_SECONDS)?);
        let optional = |key: &str| properties.string(key).map(str::to_string);
        if local {
            return Ok(Self {
                local,
                connector_under_test_id: properties
                    .string_or(CONNECTOR_AGENT_ID, ANONYMOUS_CONNECTOR_ID),
                connector_url: optional(CONNECTOR_BASE_URL),
                authorization: optional(CONNECTOR_AUTHORIZATION),
                negotiation_initiate_url: optional(CONNECTOR_NEGOTIATION_INITIATE_URL),
                transfer_initiate_url: optional(CONNECTOR_TRANSFER_INITIATE_URL),
                thread_pool,
                default_wait,
            });
        }
        let connector_url = properties.require(CONNECTOR_BASE_URL)?.to_string();
        let negotiation_initiate_url =
            properties.require(CONNECTOR_NEGOTIATION_INITIATE_URL)?.to_string();
        let transfer_initiate_url =
            properties.require(CONNECTOR_TRANSFER_INITIATE_URL)?.to_string();
        let connector_under_test_id = properties.require(CONNECTOR_AGENT_ID)?.to_string();
        Ok(Self {
            local,
            connector_under_test_id,
            connector_url: Some(connector_url),
            authorization: optional(CONNECTOR_AUTHORIZATION),
            negotiation_initiate_url: Some(negotiation_initiate_url),
            transfer_initiate_url: Some(transfer_initiate_url),
            thread_pool,
            default_wait,
        })
    }
}

// ============================================================================
// SECTION: Scoped Services
// ============================================================================

/// Services created for one scope.
#[derive(Default)]
struct ScopeServices {
    /// Consumer connector.
    consumer_connector: Option<Arc<TckConnector>>,
    /// Provider connector.
    provider_connector: Option<Arc<TckConnector>>,
    /// Provider negotiation mock.
    provider_mock: Option<Arc<dyn ProviderNegotiationMock>>,
    /// Consumer negotiation mock.
    consumer_mock: Option<Arc<dyn ConsumerNegotiationMock>>,
    /// Provider transfer process mock.
    provider_transfer_mock: Option<Arc<dyn ProviderTransferProcessMock>>,
    /// Consumer transfer process mock.
    consumer_transfer_mock: Option<Arc<dyn ConsumerTransferProcessMock>>,
    /// Negotiation client for a provider under test.
    provider_client: Option<Arc<dyn ProviderNegotiationClient>>,
    /// Negotiation client for a consumer under test.
    consumer_client: Option<Arc<dyn ConsumerNegotiationClient>>,
    /// Transfer client for a provider under test.
    provider_transfer_client: Option<Arc<dyn ProviderTransferProcessClient>>,
    /// Transfer client for a consumer under test.
    consumer_transfer_client: Option<Arc<dyn ConsumerTransferProcessClient>>,
}

impl ScopeServices {
    /// Returns the consumer connector, creating it on first use.
    fn consumer_connector(&mut self) -> Arc<TckConnector> {
        Arc::clone(self.consumer_connector.get_or_insert_with(|| Arc::new(TckConnector::new())))
    }

    /// Returns the provider connector, creating it on first use.
    fn provider_connector(&mut self) -> Arc<TckConnector> {
        Arc::clone(self.provider_connector.get_or_insert_with(|| Arc::new(TckConnector::new())))
    }
}

/// HTTP clients shared by every scope in remote mode.
struct RemoteClients {
    /// Executor carrying the authorization header.
    executor: HttpExecutor,
    /// Catalog client.
    catalog: Arc<dyn CatalogClient>,
    /// Metadata client.
    metadata: Arc<dyn MetadataClient>,
}

/// Launcher state created by `start`.
struct Started {
    /// Validated settings.
    config: DspSystemConfig,
    /// TCK callback endpoint.
    endpoint: Arc<CallbackEndpoint>,
    /// Shared serializer.
    serializer: Arc<MessageSerializer>,
    /// Pool running mock actions.
    executor: Arc<ActionExecutor>,
    /// Remote clients; `None` in local mode.
    remote: Option<RemoteClients>,
    /// Services per scope.
    scopes: Mutex<BTreeMap<String, ScopeServices>>,
}

impl Started {
    /// Runs `work` on the services of `scope`.
    fn with_scope<T>(&self, scope: &str, work: impl FnOnce(&mut ScopeServices) -> T) -> T {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        work(scopes.entry(scope.to_string()).or_default())
    }
}

// ============================================================================
// SECTION: Launcher
// ============================================================================

/// Launcher of the DSP system under test.
#[derive(Default)]
pub struct DspSystemLauncher {
    /// State set by `start`.
    started: Option<Started>,
}

impl DspSystemLauncher {
    /// Creates a launcher that still needs `start`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the started state.
    fn started(&self) -> Result<&Started, LauncherError> {
        self.started
            .as_ref()
            .ok_or_else(|| LauncherError::Service("launcher not started".to_string()))
    }

    /// Returns the validated settings.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn config(&self) -> Result<&DspSystemConfig, LauncherError> {
        Ok(&self.started()?.config)
    }

    /// Returns the consumer connector of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_connector(&self, scope: &str) -> Result<Arc<TckConnector>, LauncherError> {
        Ok(self.started()?.with_scope(scope, ScopeServices::consumer_connector))
    }

    /// Returns the provider connector of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn provider_connector(&self, scope: &str) -> Result<Arc<TckConnector>, LauncherError> {
        Ok(self.started()?.with_scope(scope, ScopeServices::provider_connector))
    }

    /// Returns the provider mock of `scope`; it scripts the local provider
    /// connector, or discards actions in remote mode.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn provider_negotiation_mock(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ProviderNegotiationMock>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(mock) = &services.provider_mock {
                return Arc::clone(mock);
            }
            let mock: Arc<dyn ProviderNegotiationMock> = if started.config.local {
                let connector = services.provider_connector();
                Arc::new(LocalProviderNegotiationMock::new(
                    connector.provider_negotiation_manager(),
                    Arc::clone(&started.executor),
                ))
            } else {
                Arc::new(NoOpProviderNegotiationMock)
            };
            services.provider_mock = Some(Arc::clone(&mock));
            mock
        }))
    }

    /// Returns the consumer mock of `scope`; it scripts the local consumer
    /// connector, or discards actions in remote mode.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_negotiation_mock(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ConsumerNegotiationMock>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(mock) = &services.consumer_mock {
                return Arc::clone(mock);
            }
            let mock: Arc<dyn ConsumerNegotiationMock> = if started.config.local {
                let connector = services.consumer_connector();
                Arc::new(LocalConsumerNegotiationMock::new(
                    connector.consumer_negotiation_manager(),
                    Arc::clone(&started.executor),
                    started.endpoint.address(),
                ))
            } else {
                Arc::new(NoOpConsumerNegotiationMock)
            };
            services.consumer_mock = Some(Arc::clone(&mock));
            mock
        }))
    }

    /// Returns the client calling the provider under test for `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start` or when the base
    /// URL is invalid.
    pub fn provider_negotiation_client(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ProviderNegotiationClient>, LauncherError> {
        let started = self.started()?;
        started.with_scope(scope, |services| {
            if let Some(client) = &services.provider_client {
                return Ok(Arc::clone(client));
            }
            let client: Arc<dyn ProviderNegotiationClient> = match &started.remote {
                None => {
                    let connector: Arc<dyn Connector> = services.provider_connector();
                    let serializer = Arc::clone(&started.serializer);
                    Arc::new(LocalProviderNegotiationClient::new(connector, serializer))
                }
                Some(remote) => {
                    let base = started.config.connector_url.as_deref().unwrap_or_default();
                    let client = HttpProviderNegotiationClient::new(base, remote.executor.clone())
                        .map_err(|err| LauncherError::Service(err.to_string()))?;
                    Arc::new(client)
                }
            };
            services.provider_client = Some(Arc::clone(&client));
            Ok(client)
        })
    }

    /// Returns the client calling the consumer under test for `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_negotiation_client(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ConsumerNegotiationClient>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(client) = &services.consumer_client {
                return Arc::clone(client);
            }
            let client: Arc<dyn ConsumerNegotiationClient> = match &started.remote {
                None => {
                    let connector: Arc<dyn Connector> = services.consumer_connector();
                    let serializer = Arc::clone(&started.serializer);
                    Arc::new(LocalConsumerNegotiationClient::new(connector, serializer))
                }
                Some(remote) => Arc::new(HttpConsumerNegotiationClient::new(
                    started.config.negotiation_initiate_url.clone().unwrap_or_default(),
                    started.endpoint.address(),
                    remote.executor.clone(),
                )),
            };
            services.consumer_client = Some(Arc::clone(&client));
            client
        }))
    }

    /// Returns the provider transfer mock of `scope`; it scripts the local
    /// provider connector, or discards actions in remote mode.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn provider_transfer_mock(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ProviderTransferProcessMock>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(mock) = &services.provider_transfer_mock {
                return Arc::clone(mock);
            }
            let mock: Arc<dyn ProviderTransferProcessMock> = if started.config.local {
                let connector = services.provider_connector();
                Arc::new(LocalProviderTransferProcessMock::new(
                    connector.provider_transfer_manager(),
                    Arc::clone(&started.executor),
                ))
            } else {
                Arc::new(NoOpProviderTransferProcessMock)
            };
            services.provider_transfer_mock = Some(Arc::clone(&mock));
            mock
        }))
    }

    /// Returns the consumer transfer mock of `scope`; it scripts the local
    /// consumer connector, or discards actions in remote mode.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_transfer_mock(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ConsumerTransferProcessMock>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(mock) = &services.consumer_transfer_mock {
                return Arc::clone(mock);
            }
            let mock: Arc<dyn ConsumerTransferProcessMock> = if started.config.local {
                let connector = services.consumer_connector();
                Arc::new(LocalConsumerTransferProcessMock::new(
                    connector.consumer_transfer_manager(),
                    Arc::clone(&started.executor),
                    started.endpoint.address(),
                ))
            } else {
                Arc::new(NoOpConsumerTransferProcessMock)
            };
            services.consumer_transfer_mock = Some(Arc::clone(&mock));
            mock
        }))
    }

    /// Returns the transfer client calling the provider under test for
    /// `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start` or when the base
    /// URL is invalid.
    pub fn provider_transfer_client(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ProviderTransferProcessClient>, LauncherError> {
        let started = self.started()?;
        started.with_scope(scope, |services| {
            if let Some(client) = &services.provider_transfer_client {
                return Ok(Arc::clone(client));
            }
            let client: Arc<dyn ProviderTransferProcessClient> = match &started.remote {
                None => {
                    let connector: Arc<dyn Connector> = services.provider_connector();
                    let serializer = Arc::clone(&started.serializer);
                    Arc::new(LocalProviderTransferProcessClient::new(connector, serializer))
                }
                Some(remote) => {
                    let base = started.config.connector_url.as_deref().unwrap_or_default();
                    let executor = remote.executor.clone();
                    let client = HttpProviderTransferProcessClient::new(base, executor)
                        .map_err(|err| LauncherError::Service(err.to_string()))?;
                    Arc::new(client)
                }
            };
            services.provider_transfer_client = Some(Arc::clone(&client));
            Ok(client)
        })
    }

    /// Returns the transfer client calling the consumer under test for
    /// `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_transfer_client(
        &self,
        scope: &str,
    ) -> Result<Arc<dyn ConsumerTransferProcessClient>, LauncherError> {
        let started = self.started()?;
        Ok(started.with_scope(scope, |services| {
            if let Some(client) = &services.consumer_transfer_client {
                return Arc::clone(client);
            }
            let client: Arc<dyn ConsumerTransferProcessClient> = match &started.remote {
                None => {
                    let connector: Arc<dyn Connector> = services.consumer_connector();
                    let serializer = Arc::clone(&started.serializer);
                    Arc::new(LocalConsumerTransferProcessClient::new(connector, serializer))
                }
                Some(remote) => Arc::new(HttpConsumerTransferProcessClient::new(
                    started.config.transfer_initiate_url.clone().unwrap_or_default(),
                    started.endpoint.address(),
                    remote.executor.clone(),
                )),
            };
            services.consumer_transfer_client = Some(Arc::clone(&client));
            client
        }))
    }

    /// Returns the catalog client; locally it reads the provider connector
    /// of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn catalog_client(&self, scope: &str) -> Result<Arc<dyn CatalogClient>, LauncherError> {
        let started = self.started()?;
        if let Some(remote) = &started.remote {
            return Ok(Arc::clone(&remote.catalog));
        }
        let connector = started.with_scope(scope, ScopeServices::provider_connector);
        Ok(Arc::new(LocalCatalogClient::new(connector, Arc::clone(&started.serializer))))
    }

    /// Returns the metadata client; locally it reads the provider connector
    /// of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn metadata_client(&self, scope: &str) -> Result<Arc<dyn MetadataClient>, LauncherError> {
        let started = self.started()?;
        if let Some(remote) = &started.remote {
            return Ok(Arc::clone(&remote.metadata));
        }
        let connector = started.with_scope(scope, ScopeServices::provider_connector);
        Ok(Arc::new(LocalMetadataClient::new(connector)))
    }

    /// Creates a pipeline in which the TCK plays the consumer of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start` or when the client
    /// cannot be created.
    pub fn provider_pipeline(
        &self,
        scope: &str,
    ) -> Result<ProviderNegotiationPipeline, LauncherError> {
        let client = self.provider_negotiation_client(scope)?;
        let connector = self.consumer_connector(scope)?;
        let started = self.started()?;
        Ok(ProviderNegotiationPipeline::new(
            client,
            connector.consumer_negotiation_manager(),
            Arc::clone(&started.endpoint),
            Arc::clone(&started.serializer),
            &started.config.connector_under_test_id,
            started.config.default_wait,
        ))
    }

    /// Creates a pipeline in which the TCK plays the provider of `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_pipeline(
        &self,
        scope: &str,
    ) -> Result<ConsumerNegotiationPipeline, LauncherError> {
        let client = self.consumer_negotiation_client(scope)?;
        let connector = self.provider_connector(scope)?;
        let started = self.started()?;
        Ok(ConsumerNegotiationPipeline::new(
            client,
            connector.provider_negotiation_manager(),
            Arc::clone(&started.endpoint),
            Arc::clone(&started.serializer),
            &started.config.connector_under_test_id,
            started.config.default_wait,
        ))
    }

    /// Creates a transfer pipeline in which the TCK plays the consumer of
    /// `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start` or when the client
    /// cannot be created.
    pub fn provider_transfer_pipeline(
        &self,
        scope: &str,
    ) -> Result<ProviderTransferProcessPipeline, LauncherError> {
        let client = self.provider_transfer_client(scope)?;
        let connector = self.consumer_connector(scope)?;
        let started = self.started()?;
        Ok(ProviderTransferProcessPipeline::new(
            client,
            connector.consumer_transfer_manager(),
            Arc::clone(&started.endpoint),
            Arc::clone(&started.serializer),
            &started.config.connector_under_test_id,
            started.config.default_wait,
        ))
    }

    /// Creates a transfer pipeline in which the TCK plays the provider of
    /// `scope`.
    ///
    /// # Errors
    /// Returns [`LauncherError::Service`] before `start`.
    pub fn consumer_transfer_pipeline(
        &self,
        scope: &str,
    ) -> Result<ConsumerTransferProcessPipeline, LauncherError> {
        let client = self.consumer_transfer_client(scope)?;
        let connector = self.provider_connector(scope)?;
        let started = self.started()?;
        Ok(ConsumerTransferProcessPipeline::new(
            client,
            connector.provider_transfer_manager(),
            Arc::clone(&started.endpoint),
            Arc::clone(&started.serializer),
            &started.config.connector_under_test_id,
            started.config.default_wait,
        ))
    }
}

impl SystemLauncher for DspSystemLauncher {
    fn start(&mut self, configuration: &SystemConfiguration) -> Result<(), LauncherError> {
        let config = DspSystemConfig::from_properties(&configuration.properties)?;
        let executor = ActionExecutor::new(config.thread_pool)
            .map_err(|err| LauncherError::Service(format!("action executor: {err}")))?;
        let remote = if config.local {
            None
        } else {
            let serializer = Arc::clone(&configuration.serializer);
            let executor = HttpExecutor::new(serializer, config.authorization.clone())
                .map_err(|err| LauncherError::Service(err.to_string()))?;
            let base = config.connector_url.as_deref().unwrap_or_default();
            Some(RemoteClients {
                catalog: Arc::new(HttpCatalogClient::new(base, executor.clone())),
                metadata: Arc::new(HttpMetadataClient::new(base, executor.clone())),
                executor,
            })
        };
        info!(
            local = config.local,
            connector = %config.connector_under_test_id,
            url = config.connector_url.as_deref().unwrap_or("-"),
            "dsp launcher started"
        );
        self.started = Some(Started {
            config,
            endpoint: Arc::clone(&configuration.endpoint),
            serializer: Arc::clone(&configuration.serializer),
            executor: Arc::new(executor),
            remote,
            scopes: Mutex::new(BTreeMap::new()),
        });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(started) = self.started.take() {
            started.executor.shutdown();
            started.endpoint.clear_handlers();
            debug!("dsp launcher closed");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
