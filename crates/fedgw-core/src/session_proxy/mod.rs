//! Session routing to sharded backend policy servers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  CentralSessionControllers (aggregate)                       │
//! │  ├── multiplexor: subscriber id -> shard index               │
//! │  └── controllers[shard]: CentralSessionController            │
//! │        ├── backend:   SessionBackend (HTTP + OAuth2)         │
//! │        ├── policy_db: omnipresent rules for new sessions     │
//! │        ├── health:    request counters, two-sample delta     │
//! │        └── disable:   flag + cancellable re-enable task      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod aggregate;
pub mod backend;
mod controller;
mod health;
mod multiplex;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::CentralSessionControllers;
pub use backend::{HttpSessionBackend, SessionBackend};
pub use controller::CentralSessionController;
pub use health::{
    evaluate, HealthTracker, OperationCounters, Outcome, SessionHealthMetrics, SessionOp,
};
pub use multiplex::{
    imsi_from_session_id, parse_imsi, MultiplexContext, Multiplexor, StaticMultiplexor,
};

use async_trait::async_trait;
use fedgw_types::{
    CreateSessionRequest, CreateSessionResponse, DisableMessage, HealthStatus,
    SessionTerminateRequest, SessionTerminateResponse, UpdateSessionRequest,
    UpdateSessionResponse,
};

use crate::error::GatewayResult;

/// Session control plus the service management calls of one controller or a set of them.
#[async_trait]
pub trait SessionController: Send + Sync {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse>;

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse>;

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse>;

    /// Report healthy for `disable_period_secs`. A single controller fails when `message`
    /// is absent; the aggregate forwards it anyway and never fails.
    async fn disable(&self, message: Option<&DisableMessage>) -> GatewayResult<()>;

    async fn enable(&self) -> GatewayResult<()>;

    async fn get_health_status(&self) -> GatewayResult<HealthStatus>;
}
