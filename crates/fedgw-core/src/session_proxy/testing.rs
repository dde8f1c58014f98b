//! Test doubles shared by the session controller tests.

use async_trait::async_trait;
use fedgw_types::models::{CreditUpdateResponse, UsageMonitoringUpdateResponse};
use fedgw_types::{
    CacheError, ChargingKey, CreateSessionRequest, CreateSessionResponse, DisableMessage,
    HealthStatus, PolicyRule, SessionTerminateRequest, SessionTerminateResponse,
    UpdateSessionRequest, UpdateSessionResponse,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::{SessionBackend, SessionController};
use crate::error::{GatewayError, GatewayResult};
use crate::policydb::PolicyDb;

/// Backend answering from canned responses, optionally slow or failing.
#[derive(Default)]
pub struct MockBackend {
    pub delay: Option<Duration>,
    pub fail: bool,
    pub create_response: CreateSessionResponse,
    pub update_requests: Mutex<Vec<UpdateSessionRequest>>,
}

impl MockBackend {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    async fn answer<T>(&self, ok: T) -> GatewayResult<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GatewayError::Backend { status: 500, message: "backend down".to_string() });
        }
        Ok(ok)
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse> {
        let mut response = self.create_response.clone();
        response.session_id = request.session_id.clone();
        self.answer(response).await
    }

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse> {
        self.update_requests.lock().push(request.clone());
        let response = UpdateSessionResponse {
            responses: request
                .updates
                .iter()
                .map(|u| CreditUpdateResponse {
                    success: true,
                    subscriber_id: u.subscriber_id.clone(),
                    session_id: u.session_id.clone(),
                    ..Default::default()
                })
                .collect(),
            usage_monitor_responses: request
                .usage_monitors
                .iter()
                .map(|u| UsageMonitoringUpdateResponse {
                    success: true,
                    subscriber_id: u.subscriber_id.clone(),
                    session_id: u.session_id.clone(),
                    ..Default::default()
                })
                .collect(),
        };
        self.answer(response).await
    }

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse> {
        self.answer(SessionTerminateResponse {
            subscriber_id: request.subscriber_id.clone(),
            session_id: request.session_id.clone(),
        })
        .await
    }
}

/// Policy lookups served from fixed data.
#[derive(Default)]
pub struct StaticPolicyDb {
    pub omnipresent_rules: Vec<String>,
    pub omnipresent_base_names: Vec<String>,
    pub base_names: HashMap<String, Vec<String>>,
}

#[async_trait]
impl PolicyDb for StaticPolicyDb {
    async fn get_policy_rule_by_id(&self, id: &str) -> GatewayResult<PolicyRule> {
        Err(CacheError::NotFound { key: id.to_string() }.into())
    }

    async fn get_charging_keys_for_rules(
        &self,
        _static_rule_ids: &[String],
        dynamic_rules: &[PolicyRule],
    ) -> Vec<ChargingKey> {
        dynamic_rules.iter().filter_map(ChargingKey::from_rule).collect()
    }

    async fn get_rule_ids_for_base_names(&self, base_names: &[String]) -> Vec<String> {
        base_names.iter().filter_map(|n| self.base_names.get(n)).flatten().cloned().collect()
    }

    async fn get_rule_definitions_for_base_names(&self, _names: &[String]) -> Vec<PolicyRule> {
        Vec::new()
    }

    async fn get_omnipresent_rules(&self) -> (Vec<String>, Vec<String>) {
        (self.omnipresent_rules.clone(), self.omnipresent_base_names.clone())
    }
}

/// Controller with scripted service management answers.
#[derive(Default)]
pub struct StubController {
    pub fail_enable: bool,
    pub fail_disable: bool,
    pub fail_update: bool,
    pub health: Option<HealthStatus>,
    pub disable_calls: Mutex<Vec<Option<DisableMessage>>>,
    pub update_requests: Mutex<Vec<UpdateSessionRequest>>,
}

#[async_trait]
impl SessionController for StubController {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse> {
        Ok(CreateSessionResponse { session_id: request.session_id.clone(), ..Default::default() })
    }

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse> {
        self.update_requests.lock().push(request.clone());
        if self.fail_update {
            return Err(GatewayError::Backend { status: 503, message: "unavailable".to_string() });
        }
        MockBackend::default().update_session(request).await
    }

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse> {
        MockBackend::default().terminate_session(request).await
    }

    async fn disable(&self, message: Option<&DisableMessage>) -> GatewayResult<()> {
        self.disable_calls.lock().push(message.copied());
        if self.fail_disable {
            return Err(GatewayError::InvalidRequest("disable rejected".to_string()));
        }
        Ok(())
    }

    async fn enable(&self) -> GatewayResult<()> {
        if self.fail_enable {
            return Err(GatewayError::Internal("enable failed".to_string()));
        }
        Ok(())
    }

    async fn get_health_status(&self) -> GatewayResult<HealthStatus> {
        self.health
            .clone()
            .ok_or_else(|| GatewayError::Internal("health unavailable".to_string()))
    }
}
