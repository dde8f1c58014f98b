//! # Federation Gateway Core
//!
//! Policy mirroring and session routing for the federation gateway.
//!
//! ## Architecture
//!
//! ```text
//! fedgw-core/src/
//! ├── cache/          # CacheMap, RemoteMap<T>, versioned codec, hash stores
//! ├── stream/         # StreamClient / StreamListener, resync mirror listener
//! ├── policydb/       # policy lookup facade over three mirrors
//! ├── session_proxy/  # multiplexor, per-shard controller, aggregate, backends
//! └── modules/        # configuration loading, logging, service bootstrap
//! ```
//!
//! Mirrors are eventually consistent with the policy streams; a full resync
//! repairs any partial state left by an interrupted update.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Disable state guards are held only for short synchronous sections"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(
    clippy::module_name_repetitions,
    reason = "Type names like SessionController read better at call sites"
)]
// Test-only lints: allow panic!, unwrap, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod cache;
pub mod error;
pub mod modules;
pub mod policydb;
pub mod session_proxy;
pub mod stream;

// Re-export commonly used types
pub use cache::{CacheMap, HashStore, MemoryHashStore, RedisHashStore, RemoteMap};
pub use error::{GatewayError, GatewayResult, MultiError};
pub use policydb::{PolicyDb, PolicyDbClient};
pub use session_proxy::{
    CentralSessionController, CentralSessionControllers, HttpSessionBackend, SessionBackend,
    SessionController, StaticMultiplexor,
};
pub use stream::{ChannelStreamClient, StreamClient, StreamListener};
