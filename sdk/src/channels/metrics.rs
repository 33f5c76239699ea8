//! Site-wide metrics channel.

use serde_json::{Map, Value};

use super::{CableChannel, ChannelKind};
use crate::types::Metric;
use crate::ws::{Identifier, WsError};

/// The global activity feed. Has no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsKind;

impl ChannelKind for MetricsKind {
    const NAME: &'static str = "MetricsChannel";
    type Key = ();
    type Payload = Metric;

    fn identifier(_: &()) -> Identifier {
        Identifier::new(Self::NAME)
    }
}

/// Channel delivering [`Metric`] events.
pub type MetricsChannel = CableChannel<MetricsKind>;

impl CableChannel<MetricsKind> {
    /// Reports a metric to the server.
    ///
    /// # Errors
    ///
    /// Returns `NotSubscribed` unless the channel is active, or a
    /// serialization error.
    pub fn send_metric(&self, metric: &Metric) -> Result<(), WsError> {
        self.perform("send_metric", metric_data(metric)?)
    }
}

fn metric_data(metric: &Metric) -> Result<Map<String, Value>, WsError> {
    let mut data = Map::new();
    data.insert("metric".to_string(), serde_json::to_value(metric)?);
    Ok(data)
}
