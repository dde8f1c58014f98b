//! Subscriber to shard mapping.
//!
//! Shards are fixed at startup; there is no online resharding and no consistent
//! hashing ring, so changing the controller count moves most subscribers.

use fedgw_types::{ConfigError, RoutingError};

use crate::error::GatewayResult;

const IMSI_PREFIX: &str = "IMSI";

/// Numeric subscriber id being resolved for routing, or the first error hit on the way.
///
/// Every derivation is a no-op once the context holds an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexContext(Result<Option<u64>, RoutingError>);

impl Default for MultiplexContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiplexContext {
    pub fn new() -> Self {
        Self(Ok(None))
    }

    /// Resolve from a raw subscriber id such as `IMSI001010000000001`.
    pub fn with_imsi(self, imsi: &str) -> Self {
        match self.0 {
            Ok(_) => Self(parse_imsi(imsi).map(Some)),
            Err(_) => self,
        }
    }

    /// Resolve from a session id of the form `<IMSI>-<suffix>`.
    pub fn with_session_id(self, session_id: &str) -> Self {
        match self.0 {
            Ok(_) => match imsi_from_session_id(session_id) {
                Ok(imsi) => self.with_imsi(imsi),
                Err(e) => Self(Err(e)),
            },
            Err(_) => self,
        }
    }

    pub fn imsi(&self) -> Result<u64, RoutingError> {
        match &self.0 {
            Ok(Some(imsi)) => Ok(*imsi),
            Ok(None) => Err(RoutingError::missing("subscriber_id")),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Numeric value of an IMSI, with or without its `IMSI` prefix.
pub fn parse_imsi(imsi: &str) -> Result<u64, RoutingError> {
    let digits = imsi.strip_prefix(IMSI_PREFIX).unwrap_or(imsi);
    if digits.is_empty() {
        return Err(RoutingError::invalid_subscriber(imsi, "no digits"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RoutingError::invalid_subscriber(imsi, "non-digit characters"));
    }
    digits.parse::<u64>().map_err(|e| RoutingError::invalid_subscriber(imsi, &e.to_string()))
}

/// The subscriber id part of a session id, everything before the first `-`.
pub fn imsi_from_session_id(session_id: &str) -> Result<&str, RoutingError> {
    match session_id.split_once('-') {
        Some((imsi, _)) if !imsi.is_empty() => Ok(imsi),
        _ => Err(RoutingError::invalid_subscriber(session_id, "not of the form <IMSI>-<suffix>")),
    }
}

/// Picks the controller index serving a subscriber.
pub trait Multiplexor: Send + Sync {
    fn get_index(&self, ctx: &MultiplexContext) -> Result<usize, RoutingError>;

    fn total(&self) -> usize;
}

/// `index = imsi mod shards`.
#[derive(Debug, Clone, Copy)]
pub struct StaticMultiplexor {
    shards: usize,
}

impl StaticMultiplexor {
    pub fn new(shards: usize) -> GatewayResult<Self> {
        if shards < 1 {
            let e = ConfigError::invalid("controllers", "at least one controller is required");
            return Err(e.into());
        }
        Ok(Self { shards })
    }
}

impl Multiplexor for StaticMultiplexor {
    fn get_index(&self, ctx: &MultiplexContext) -> Result<usize, RoutingError> {
        let imsi = ctx.imsi()?;
        Ok((imsi % self.shards as u64) as usize)
    }

    fn total(&self) -> usize {
        self.shards
    }
}
