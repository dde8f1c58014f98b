//! Session controller bound to one backend shard.

use async_trait::async_trait;
use fedgw_types::models::StaticRuleInstall;
use fedgw_types::{
    CreateSessionRequest, CreateSessionResponse, DisableMessage, HealthConfig, HealthStatus,
    SessionControllerConfig, SessionTerminateRequest, SessionTerminateResponse,
    UpdateSessionRequest, UpdateSessionResponse,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::backend::SessionBackend;
use super::health::{evaluate, HealthTracker, Outcome, SessionOp};
use super::SessionController;
use crate::error::{GatewayError, GatewayResult};
use crate::policydb::PolicyDb;

#[derive(Debug, Default)]
struct DisableState {
    disabled: bool,
    /// Bumped by every disable and enable; a re-enable timer only acts on its own generation.
    generation: u64,
    reenable: Option<JoinHandle<()>>,
}

impl DisableState {
    fn expire(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.disabled = false;
        self.reenable = None;
        true
    }
}

pub struct CentralSessionController {
    shard: usize,
    backend: Arc<dyn SessionBackend>,
    policy_db: Arc<dyn PolicyDb>,
    config: SessionControllerConfig,
    health_config: HealthConfig,
    health: HealthTracker,
    disable_state: Arc<Mutex<DisableState>>,
}

impl CentralSessionController {
    pub fn new(
        shard: usize,
        backend: Arc<dyn SessionBackend>,
        policy_db: Arc<dyn PolicyDb>,
        config: SessionControllerConfig,
        health_config: HealthConfig,
    ) -> Self {
        Self {
            shard,
            backend,
            policy_db,
            config,
            health_config,
            health: HealthTracker::new(shard),
            disable_state: Arc::new(Mutex::new(DisableState::default())),
        }
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    pub fn is_disabled(&self) -> bool {
        self.disable_state.lock().disabled
    }

    pub fn health_tracker(&self) -> &HealthTracker {
        &self.health
    }

    /// Run a backend call under the request deadline and count its outcome.
    async fn call<T, F>(&self, op: SessionOp, call: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let result = match tokio::time::timeout(self.config.request_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                shard: self.shard,
                timeout_ms: self.config.request_timeout_ms,
            }),
        };

        self.health.record(op, Outcome::of(&result));
        if let Err(e) = &result {
            tracing::warn!(shard = self.shard, op = %op, error = %e, "Backend call failed");
        }
        result
    }

    /// Add the network-wide rules the backend did not install itself.
    async fn add_omnipresent_rules(&self, response: &mut CreateSessionResponse) {
        let (mut rule_ids, base_names) = self.policy_db.get_omnipresent_rules().await;
        if !base_names.is_empty() {
            rule_ids.extend(self.policy_db.get_rule_ids_for_base_names(&base_names).await);
        }

        let mut installed: HashSet<String> =
            response.static_rules.iter().map(|r| r.rule_id.clone()).collect();
        for rule_id in rule_ids {
            if installed.insert(rule_id.clone()) {
                response.static_rules.push(StaticRuleInstall { rule_id });
            }
        }
    }
}

#[async_trait]
impl SessionController for CentralSessionController {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse> {
        let mut response = if self.config.disable_backend {
            tracing::debug!(
                shard = self.shard,
                session_id = %request.session_id,
                "Backend disabled, answering locally"
            );
            CreateSessionResponse { session_id: request.session_id.clone(), ..Default::default() }
        } else {
            self.call(SessionOp::Create, self.backend.create_session(request)).await?
        };
        self.add_omnipresent_rules(&mut response).await;
        Ok(response)
    }

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse> {
        if self.config.disable_backend {
            return Ok(UpdateSessionResponse::default());
        }
        self.call(SessionOp::Update, self.backend.update_session(request)).await
    }

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse> {
        if self.config.disable_backend {
            return Ok(SessionTerminateResponse {
                subscriber_id: request.subscriber_id.clone(),
                session_id: request.session_id.clone(),
            });
        }
        self.call(SessionOp::Terminate, self.backend.terminate_session(request)).await
    }

    async fn disable(&self, message: Option<&DisableMessage>) -> GatewayResult<()> {
        let message = message
            .ok_or_else(|| GatewayError::InvalidRequest("missing disable message".to_string()))?;

        let mut state = self.disable_state.lock();
        if state.disabled {
            tracing::debug!(shard = self.shard, "Controller already disabled");
            return Ok(());
        }

        let period = Duration::from_secs(message.disable_period_secs);
        let shared = Arc::clone(&self.disable_state);
        let shard = self.shard;
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        state.disabled = true;
        state.reenable = Some(tokio::spawn(async move {
            tokio::time::sleep(period).await;
            if shared.lock().expire(generation) {
                tracing::info!(shard, "Controller re-enabled after disable period");
            }
        }));
        tracing::info!(
            shard = self.shard,
            period_secs = message.disable_period_secs,
            "Controller disabled"
        );
        Ok(())
    }

    async fn enable(&self) -> GatewayResult<()> {
        let mut state = self.disable_state.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(task) = state.reenable.take() {
            task.abort();
        }
        if state.disabled {
            tracing::info!(shard = self.shard, "Controller enabled");
        }
        state.disabled = false;
        Ok(())
    }

    async fn get_health_status(&self) -> GatewayResult<HealthStatus> {
        let delta = match self.health.take_delta() {
            Ok(delta) => delta,
            Err(e) => return Ok(HealthStatus::unhealthy(e.to_string())),
        };
        if self.is_disabled() {
            return Ok(HealthStatus::healthy("controller is disabled"));
        }

        let status = evaluate(&delta, &self.health_config);
        if !status.is_healthy() {
            tracing::warn!(
                shard = self.shard,
                message = %status.health_message,
                "Controller unhealthy"
            );
        }
        Ok(status)
    }
}
