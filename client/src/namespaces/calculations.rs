//! Calculation endpoints.

use super::{command, correlate, decode_items, latest_item};
use crate::stream::StreamManager;
use crate::transport::Transport;
use crate::types::{Calculation, Engine, RequestId};
use catalyst_core::{EntityKind, Error};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;

const BASE: &str = "v0/calculations";

/// Calculation commands and their correlated results.
pub struct Calculations {
    transport: Arc<Transport>,
    stream: Arc<StreamManager>,
}

impl Calculations {
    pub(crate) fn new(transport: Arc<Transport>, stream: Arc<StreamManager>) -> Self {
        Self { transport, stream }
    }

    /// Schedule a calculation; progress arrives on the event stream.
    pub async fn create_event(
        &self,
        data_id: u64,
        engine: Option<&str>,
    ) -> Result<RequestId, Error> {
        let body = json!({"data_id": data_id, "engine": engine});
        command(&self.transport, Method::POST, BASE, Some(body)).await
    }

    /// Schedule a calculation and wait for the scheduled entity.
    pub async fn create(
        &self,
        data_id: u64,
        engine: Option<&str>,
    ) -> Result<Option<Calculation>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.create_event(data_id, engine).await?.request_id)
        })
        .await?;
        latest_item(&event, EntityKind::Calculations)
            .map(super::decode_item)
            .transpose()
    }

    /// Request the calculation listing; the listing arrives on the stream.
    pub async fn list_event(&self) -> Result<RequestId, Error> {
        command(&self.transport, Method::GET, BASE, None).await
    }

    /// List the account's calculations.
    pub async fn list(&self) -> Result<Vec<Calculation>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.list_event().await?.request_id)
        })
        .await?;
        decode_items(&event, EntityKind::Calculations)
    }

    /// Submit a cancellation; completion arrives on the event stream.
    pub async fn cancel_event(&self, calculation_id: u64) -> Result<RequestId, Error> {
        let path = format!("{BASE}/{calculation_id}");
        command(&self.transport, Method::DELETE, &path, None).await
    }

    /// Cancel a calculation and wait for the acknowledging event.
    pub async fn cancel(&self, calculation_id: u64) -> Result<(), Error> {
        correlate(&self.stream, || async {
            Ok(self.cancel_event(calculation_id).await?.request_id)
        })
        .await?;
        Ok(())
    }

    /// Engines the backend can run calculations on. Answered directly,
    /// not through the stream.
    pub async fn supported_engines(&self) -> Result<Vec<Engine>, Error> {
        let path = format!("{BASE}/supported");
        let value = self
            .transport
            .request_json(Method::GET, &path, None, true)
            .await?;
        // Either a bare array or wrapped in a "data" field.
        let engines = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        serde_json::from_value(engines).map_err(|err| Error::Decode(err.to_string()))
    }
}
