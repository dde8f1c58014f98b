//! Backend policy servers the session controllers forward to.

mod http;

pub use http::HttpSessionBackend;

use async_trait::async_trait;
use fedgw_types::{
    CreateSessionRequest, CreateSessionResponse, SessionTerminateRequest,
    SessionTerminateResponse, UpdateSessionRequest, UpdateSessionResponse,
};

use crate::error::GatewayResult;

/// Session control calls answered by one backend.
#[async_trait]
pub trait SessionBackend: Send + Sync {
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
}
