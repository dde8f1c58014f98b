//! Routes session calls across all controller shards.

use async_trait::async_trait;
use fedgw_types::{
    ConfigError, CreateSessionRequest, CreateSessionResponse, DisableMessage, GatewayConfig,
    HealthStatus, RoutingError, SessionTerminateRequest, SessionTerminateResponse,
    UpdateSessionRequest, UpdateSessionResponse,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::backend::HttpSessionBackend;
use super::controller::CentralSessionController;
use super::multiplex::{MultiplexContext, Multiplexor, StaticMultiplexor};
use super::SessionController;
use crate::error::{GatewayError, GatewayResult, MultiError};
use crate::policydb::PolicyDb;

/// Slack on top of the slowest controller's own request deadline.
const FANOUT_GRACE: Duration = Duration::from_secs(1);

/// Session controllers for every shard behind one multiplexor.
pub struct CentralSessionControllers {
    controllers: Vec<Arc<dyn SessionController>>,
    multiplexor: Arc<dyn Multiplexor>,
    fanout_timeout: Option<Duration>,
}

impl CentralSessionControllers {
    pub fn new(
        controllers: Vec<Arc<dyn SessionController>>,
        multiplexor: Arc<dyn Multiplexor>,
    ) -> GatewayResult<Self> {
        if controllers.is_empty() {
            let e = ConfigError::invalid("controllers", "no session controllers configured");
            return Err(e.into());
        }
        if multiplexor.total() != controllers.len() {
            let e = ConfigError::invalid(
                "controllers",
                format!(
                    "multiplexor spans {} shards but {} controllers are configured",
                    multiplexor.total(),
                    controllers.len()
                ),
            );
            return Err(e.into());
        }
        Ok(Self { controllers, multiplexor, fanout_timeout: None })
    }

    /// Bound each shard's part of an update fan-out.
    pub fn with_fanout_timeout(mut self, timeout: Duration) -> Self {
        self.fanout_timeout = Some(timeout);
        self
    }

    /// One HTTP-backed controller per configured shard, in configuration order.
    pub fn from_config(
        config: &GatewayConfig,
        policy_db: Arc<dyn PolicyDb>,
    ) -> GatewayResult<Self> {
        let mut controllers: Vec<Arc<dyn SessionController>> =
            Vec::with_capacity(config.controllers.len());
        for (shard, controller_config) in config.controllers.iter().enumerate() {
            let backend = HttpSessionBackend::new(controller_config)?;
            controllers.push(Arc::new(CentralSessionController::new(
                shard,
                Arc::new(backend),
                Arc::clone(&policy_db),
                controller_config.clone(),
                config.health,
            )));
        }

        let multiplexor = StaticMultiplexor::new(controllers.len())?;
        let slowest =
            config.controllers.iter().map(|c| c.request_timeout()).max().unwrap_or_default();
        tracing::info!(controllers = controllers.len(), "Session controllers configured");
        let aggregate = Self::new(controllers, Arc::new(multiplexor))?;
        Ok(aggregate.with_fanout_timeout(slowest + FANOUT_GRACE))
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    fn shard_for(&self, ctx: &MultiplexContext) -> Result<usize, RoutingError> {
        let index = self.multiplexor.get_index(ctx)?;
        if index >= self.controllers.len() {
            return Err(RoutingError::OutOfRange { index, total: self.controllers.len() });
        }
        Ok(index)
    }

    fn shard_for_session(&self, session_id: &str) -> Result<usize, RoutingError> {
        self.shard_for(&MultiplexContext::new().with_session_id(session_id))
    }

    /// Split an update by shard. Any entry that cannot be routed fails the whole request.
    fn partition(
        &self,
        request: &UpdateSessionRequest,
    ) -> Result<BTreeMap<usize, UpdateSessionRequest>, RoutingError> {
        let mut per_shard: BTreeMap<usize, UpdateSessionRequest> = BTreeMap::new();
        for update in &request.updates {
            let shard = self.shard_for_session(&update.session_id)?;
            per_shard.entry(shard).or_default().updates.push(update.clone());
        }
        for monitor in &request.usage_monitors {
            let shard = self.shard_for_session(&monitor.session_id)?;
            per_shard.entry(shard).or_default().usage_monitors.push(monitor.clone());
        }
        Ok(per_shard)
    }
}

#[async_trait]
impl SessionController for CentralSessionControllers {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse> {
        if request.subscriber_id.is_empty() {
            return Err(RoutingError::missing("subscriber_id").into());
        }
        let shard = self.shard_for(&MultiplexContext::new().with_imsi(&request.subscriber_id))?;
        tracing::debug!(shard, subscriber_id = %request.subscriber_id, "Routing create session");
        self.controllers[shard].create_session(request).await
    }

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse> {
        if request.is_empty() {
            return Ok(UpdateSessionResponse::default());
        }
        let per_shard = self.partition(request)?;

        let (tx, mut rx) = mpsc::channel::<UpdateSessionResponse>(per_shard.len());
        let aggregator = tokio::spawn(async move {
            let mut merged = UpdateSessionResponse::default();
            while let Some(response) = rx.recv().await {
                merged.merge(response);
            }
            merged
        });

        let mut tasks = JoinSet::new();
        for (shard, shard_request) in per_shard {
            let controller = Arc::clone(&self.controllers[shard]);
            let tx = tx.clone();
            let deadline = self.fanout_timeout;
            tasks.spawn(async move {
                let call = controller.update_session(&shard_request);
                let result = match deadline {
                    Some(deadline) => match tokio::time::timeout(deadline, call).await {
                        Ok(result) => result,
                        Err(_) => Err(GatewayError::Timeout {
                            shard,
                            timeout_ms: deadline.as_millis() as u64,
                        }),
                    },
                    None => call.await,
                };
                match result {
                    Ok(response) => {
                        if tx.send(response).await.is_err() {
                            tracing::error!(shard, "Update aggregator is gone");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(shard, error = %e, "Dropping shard from update response");
                    },
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Update task did not complete");
            }
        }
        drop(tx);

        aggregator
            .await
            .map_err(|e| GatewayError::Internal(format!("update aggregator failed: {}", e)))
    }

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse> {
        if request.session_id.is_empty() {
            return Err(RoutingError::missing("session_id").into());
        }
        let shard = self.shard_for_session(&request.session_id)?;
        tracing::debug!(shard, session_id = %request.session_id, "Routing terminate session");
        self.controllers[shard].terminate_session(request).await
    }

    /// Forward to every shard; shard errors are logged and never fail the call.
    async fn disable(&self, message: Option<&DisableMessage>) -> GatewayResult<()> {
        for (shard, controller) in self.controllers.iter().enumerate() {
            if let Err(e) = controller.disable(message).await {
                tracing::warn!(shard, error = %e, "Failed to disable controller");
            }
        }
        Ok(())
    }

    async fn enable(&self) -> GatewayResult<()> {
        let results = join_all(self.controllers.iter().map(|c| c.enable())).await;

        let mut errors = MultiError::new();
        for (shard, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                errors.push(shard, e);
            }
        }
        errors.into_result()
    }

    async fn get_health_status(&self) -> GatewayResult<HealthStatus> {
        for (shard, controller) in self.controllers.iter().enumerate() {
            let status = controller.get_health_status().await.map_err(|e| {
                tracing::warn!(shard, error = %e, "Health check failed");
                e
            })?;
            if !status.is_healthy() {
                return Ok(status);
            }
        }
        Ok(HealthStatus::healthy("all session controllers are healthy"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_proxy::testing::{MockBackend, StaticPolicyDb, StubController};
    use fedgw_types::models::{CreditUsage, CreditUsageUpdate, UsageMonitoringUpdateRequest};
    use fedgw_types::{HealthConfig, ServiceHealth, SessionControllerConfig};

    /// Multiplexor that always answers the same index.
    struct FixedMultiplexor {
        index: usize,
        total: usize,
    }

    impl Multiplexor for FixedMultiplexor {
        fn get_index(&self, _ctx: &MultiplexContext) -> Result<usize, RoutingError> {
            Ok(self.index)
        }

        fn total(&self) -> usize {
            self.total
        }
    }

    fn aggregate_of(
        stubs: Vec<StubController>,
    ) -> (Vec<Arc<StubController>>, CentralSessionControllers) {
        let stubs: Vec<Arc<StubController>> = stubs.into_iter().map(Arc::new).collect();
        let controllers: Vec<Arc<dyn SessionController>> =
            stubs.iter().map(|s| Arc::clone(s) as Arc<dyn SessionController>).collect();
        let multiplexor = Arc::new(StaticMultiplexor::new(controllers.len()).unwrap());
        let aggregate = CentralSessionControllers::new(controllers, multiplexor).unwrap();
        (stubs, aggregate)
    }

    fn defaults(count: usize) -> Vec<StubController> {
        (0..count).map(|_| StubController::default()).collect()
    }

    fn credit_update(imsi: u64) -> CreditUsageUpdate {
        CreditUsageUpdate {
            subscriber_id: format!("IMSI{:015}", imsi),
            session_id: format!("IMSI{:015}-{}", imsi, imsi * 100),
            usage: CreditUsage { charging_key: 1, ..Default::default() },
            ..Default::default()
        }
    }

    fn monitor_update(imsi: u64) -> UsageMonitoringUpdateRequest {
        UsageMonitoringUpdateRequest {
            subscriber_id: format!("IMSI{:015}", imsi),
            session_id: format!("IMSI{:015}-{}", imsi, imsi * 100),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_controller_list_is_rejected() {
        let multiplexor = Arc::new(StaticMultiplexor::new(1).unwrap());
        let err = CentralSessionControllers::new(Vec::new(), multiplexor).err().unwrap();
        assert!(matches!(err, GatewayError::Config(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_multiplexor_must_span_every_controller() {
        let controllers: Vec<Arc<dyn SessionController>> =
            defaults(2).into_iter().map(|s| Arc::new(s) as Arc<dyn SessionController>).collect();
        let multiplexor = Arc::new(StaticMultiplexor::new(3).unwrap());
        let err = CentralSessionControllers::new(controllers, multiplexor).err().unwrap();
        assert!(matches!(
            err,
            GatewayError::Config(ConfigError::ValidationError { ref field, .. })
                if field == "controllers"
        ));
    }

    #[tokio::test]
    async fn test_update_fans_in_both_shards() {
        let (stubs, aggregate) = aggregate_of(defaults(2));
        let request = UpdateSessionRequest {
            updates: vec![credit_update(10), credit_update(11)],
            usage_monitors: vec![monitor_update(13)],
        };

        let response = aggregate.update_session(&request).await.unwrap();
        assert_eq!(response.responses.len(), 2);
        assert_eq!(response.usage_monitor_responses.len(), 1);

        let mut sessions: Vec<String> =
            response.responses.iter().map(|r| r.session_id.clone()).collect();
        sessions.sort();
        assert_eq!(sessions, vec![credit_update(10).session_id, credit_update(11).session_id]);

        // Each shard only sees its own subscribers.
        let even = stubs[0].update_requests.lock();
        assert_eq!(even.len(), 1);
        assert_eq!(even[0].updates, vec![credit_update(10)]);
        assert!(even[0].usage_monitors.is_empty());
        let odd = stubs[1].update_requests.lock();
        assert_eq!(odd[0].updates, vec![credit_update(11)]);
        assert_eq!(odd[0].usage_monitors, vec![monitor_update(13)]);
    }

    #[tokio::test]
    async fn test_failed_shard_is_omitted() {
        let failing = StubController { fail_update: true, ..Default::default() };
        let (_, aggregate) = aggregate_of(vec![StubController::default(), failing]);
        let request = UpdateSessionRequest {
            updates: vec![credit_update(10), credit_update(11), credit_update(12)],
            usage_monitors: Vec::new(),
        };

        let response = aggregate.update_session(&request).await.unwrap();
        let mut sessions: Vec<String> =
            response.responses.iter().map(|r| r.session_id.clone()).collect();
        sessions.sort();
        assert_eq!(sessions, vec![credit_update(10).session_id, credit_update(12).session_id]);
    }

    #[tokio::test]
    async fn test_unroutable_entry_fails_whole_update() {
        let (stubs, aggregate) = aggregate_of(defaults(2));
        let mut bad = credit_update(11);
        bad.session_id = "not-an-imsi".to_string();
        let request = UpdateSessionRequest {
            updates: vec![credit_update(10), bad],
            usage_monitors: Vec::new(),
        };

        let err = aggregate.update_session(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Routing(RoutingError::InvalidSubscriber { .. })));
        assert!(stubs.iter().all(|s| s.update_requests.lock().is_empty()));
    }

    #[tokio::test]
    async fn test_empty_update_is_empty_response() {
        let (stubs, aggregate) = aggregate_of(defaults(1));
        let response = aggregate.update_session(&UpdateSessionRequest::default()).await.unwrap();
        assert_eq!(response, UpdateSessionResponse::default());
        assert!(stubs[0].update_requests.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_shard_does_not_stall_update() {
        let controllers: Vec<Arc<dyn SessionController>> = vec![
            Arc::new(StubController::default()),
            Arc::new(CentralSessionController::new(
                1,
                Arc::new(MockBackend::slow(Duration::from_secs(3600))),
                Arc::new(StaticPolicyDb::default()),
                SessionControllerConfig {
                    api_root: "http://localhost/api".to_string(),
                    token_url: "http://localhost/token".to_string(),
                    client_id: String::new(),
                    client_secret: String::new(),
                    disable_backend: false,
                    request_timeout_ms: 600_000,
                },
                HealthConfig::default(),
            )),
        ];
        let multiplexor = Arc::new(StaticMultiplexor::new(2).unwrap());
        let aggregate = CentralSessionControllers::new(controllers, multiplexor)
            .unwrap()
            .with_fanout_timeout(Duration::from_secs(2));
        let request = UpdateSessionRequest {
            updates: vec![credit_update(10), credit_update(11)],
            usage_monitors: Vec::new(),
        };

        let response = aggregate.update_session(&request).await.unwrap();
        assert_eq!(response.responses.len(), 1);
        assert_eq!(response.responses[0].session_id, credit_update(10).session_id);
    }

    #[tokio::test]
    async fn test_create_routes_by_subscriber_id() {
        let (_, aggregate) = aggregate_of(defaults(2));
        let request = CreateSessionRequest {
            subscriber_id: "IMSI000000000000011".to_string(),
            session_id: "IMSI000000000000011-1".to_string(),
            ..Default::default()
        };
        let response = aggregate.create_session(&request).await.unwrap();
        assert_eq!(response.session_id, request.session_id);

        let missing = CreateSessionRequest { subscriber_id: String::new(), ..request };
        let err = aggregate.create_session(&missing).await.unwrap_err();
        assert!(matches!(err, GatewayError::Routing(RoutingError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_terminate_routes_by_session_id() {
        let (_, aggregate) = aggregate_of(defaults(2));
        let request = SessionTerminateRequest {
            session_id: "IMSI000000000000011-1".to_string(),
            ..Default::default()
        };
        let response = aggregate.terminate_session(&request).await.unwrap();
        assert_eq!(response.session_id, request.session_id);

        let err = aggregate
            .terminate_session(&SessionTerminateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Routing(RoutingError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_out_of_range_shard_is_a_routing_error() {
        let controllers: Vec<Arc<dyn SessionController>> =
            vec![Arc::new(StubController::default())];
        let multiplexor = Arc::new(FixedMultiplexor { index: 3, total: 1 });
        let aggregate = CentralSessionControllers::new(controllers, multiplexor).unwrap();
        let request = SessionTerminateRequest {
            session_id: "IMSI000000000000011-1".to_string(),
            ..Default::default()
        };

        let err = aggregate.terminate_session(&request).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Routing(RoutingError::OutOfRange { index: 3, total: 1 })
        ));
    }

    #[tokio::test]
    async fn test_disable_reaches_every_controller() {
        let (stubs, aggregate) = aggregate_of(defaults(2));
        let message = DisableMessage { disable_period_secs: 30 };
        aggregate.disable(Some(&message)).await.unwrap();
        assert!(stubs.iter().all(|s| s.disable_calls.lock().as_slice() == [Some(message)]));
    }

    #[tokio::test]
    async fn test_disable_ignores_controller_errors() {
        let failing = StubController { fail_disable: true, ..Default::default() };
        let (stubs, aggregate) = aggregate_of(vec![failing, StubController::default()]);

        aggregate.disable(None).await.unwrap();
        assert!(stubs.iter().all(|s| s.disable_calls.lock().as_slice() == [None]));

        let message = DisableMessage { disable_period_secs: 30 };
        aggregate.disable(Some(&message)).await.unwrap();
        assert_eq!(stubs[1].disable_calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_enable_collects_shard_errors() {
        let failing = || StubController { fail_enable: true, ..Default::default() };
        let (_, aggregate) = aggregate_of(vec![failing(), StubController::default(), failing()]);

        let err = aggregate.enable().await.unwrap_err();
        let GatewayError::Multi(errors) = &err else {
            panic!("expected a multi error, got {}", err);
        };
        let shards: Vec<usize> = errors.errors().iter().map(|(shard, _)| *shard).collect();
        assert_eq!(shards, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_health_reports_first_unhealthy_controller() {
        let healthy = || StubController {
            health: Some(HealthStatus::healthy("ok")),
            ..Default::default()
        };
        let unhealthy = |msg: &str| StubController {
            health: Some(HealthStatus::unhealthy(msg)),
            ..Default::default()
        };

        let (_, aggregate) = aggregate_of(vec![healthy(), unhealthy("first"), unhealthy("second")]);
        let status = aggregate.get_health_status().await.unwrap();
        assert_eq!(status.health, ServiceHealth::Unhealthy);
        assert_eq!(status.health_message, "first");

        let (_, aggregate) = aggregate_of(vec![healthy(), healthy()]);
        assert!(aggregate.get_health_status().await.unwrap().is_healthy());

        let (_, aggregate) = aggregate_of(vec![healthy(), StubController::default()]);
        assert!(aggregate.get_health_status().await.is_err());
    }
}
