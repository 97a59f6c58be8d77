//! Collection endpoints.

use super::{command, correlate, decode_items, latest_item};
use crate::stream::StreamManager;
use crate::transport::Transport;
use crate::types::{Collection, CollectionCreate, RequestId};
use catalyst_core::{EntityKind, Error};
use reqwest::Method;
use std::sync::Arc;

const BASE: &str = "v0/collections";

/// Collection commands and their correlated results.
pub struct Collections {
    transport: Arc<Transport>,
    stream: Arc<StreamManager>,
}

impl Collections {
    pub(crate) fn new(transport: Arc<Transport>, stream: Arc<StreamManager>) -> Self {
        Self { transport, stream }
    }

    /// Create or edit a collection; the result arrives on the event stream.
    pub async fn create_event(&self, draft: &CollectionCreate) -> Result<RequestId, Error> {
        let body = serde_json::to_value(draft).map_err(|err| Error::Decode(err.to_string()))?;
        command(&self.transport, Method::PUT, BASE, Some(body)).await
    }

    /// Create or edit a collection and wait for the stored entity.
    pub async fn create(&self, draft: &CollectionCreate) -> Result<Option<Collection>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.create_event(draft).await?.request_id)
        })
        .await?;
        latest_item(&event, EntityKind::Collections)
            .map(super::decode_item)
            .transpose()
    }

    /// Request the collection listing; the listing arrives on the stream.
    pub async fn list_event(&self) -> Result<RequestId, Error> {
        command(&self.transport, Method::GET, BASE, None).await
    }

    /// List the account's collections.
    pub async fn list(&self) -> Result<Vec<Collection>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.list_event().await?.request_id)
        })
        .await?;
        decode_items(&event, EntityKind::Collections)
    }

    /// Submit a removal; completion arrives on the event stream.
    pub async fn delete_event(&self, collection_id: u64) -> Result<RequestId, Error> {
        let path = format!("{BASE}/{collection_id}");
        command(&self.transport, Method::DELETE, &path, None).await
    }

    /// Remove a collection and wait for the acknowledging event.
    pub async fn delete(&self, collection_id: u64) -> Result<(), Error> {
        correlate(&self.stream, || async {
            Ok(self.delete_event(collection_id).await?.request_id)
        })
        .await?;
        Ok(())
    }
}
