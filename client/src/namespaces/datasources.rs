//! Data source endpoints.

use super::{command, correlate, decode_items, latest_item};
use crate::stream::StreamManager;
use crate::transport::Transport;
use crate::types::{DataSource, DataSourceContent, RequestId};
use catalyst_core::{EntityKind, Error};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;

const BASE: &str = "v0/datasources";

/// Data source commands and their correlated results.
pub struct DataSources {
    transport: Arc<Transport>,
    stream: Arc<StreamManager>,
}

impl DataSources {
    pub(crate) fn new(transport: Arc<Transport>, stream: Arc<StreamManager>) -> Self {
        Self { transport, stream }
    }

    /// Submit a data source; the result arrives on the event stream.
    pub async fn create_event(
        &self,
        content: &str,
        fmt: Option<&str>,
        name: Option<&str>,
    ) -> Result<RequestId, Error> {
        let body = json!({"content": content, "fmt": fmt, "name": name});
        command(&self.transport, Method::POST, BASE, Some(body)).await
    }

    /// Create a data source and wait for the created entity.
    pub async fn create(
        &self,
        content: &str,
        fmt: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<DataSource>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.create_event(content, fmt, name).await?.request_id)
        })
        .await?;
        latest_item(&event, EntityKind::DataSources)
            .map(super::decode_item)
            .transpose()
    }

    /// Request the data source listing; the listing arrives on the stream.
    pub async fn list_event(&self) -> Result<RequestId, Error> {
        command(&self.transport, Method::GET, BASE, None).await
    }

    /// List all data sources visible to the account.
    pub async fn list(&self) -> Result<Vec<DataSource>, Error> {
        let event = correlate(&self.stream, || async {
            Ok(self.list_event().await?.request_id)
        })
        .await?;
        decode_items(&event, EntityKind::DataSources)
    }

    /// Fetch one data source by id, if it exists.
    pub async fn get(&self, data_id: u64) -> Result<Option<DataSource>, Error> {
        let sources = self.list().await?;
        Ok(sources.into_iter().rev().find(|source| source.id == data_id))
    }

    /// Fetch one data source's raw content.
    ///
    /// Answered directly by the backend, not through the stream.
    pub async fn get_content(&self, data_id: u64) -> Result<DataSourceContent, Error> {
        let path = format!("{BASE}/{data_id}");
        let value = self
            .transport
            .request_json(Method::GET, &path, None, true)
            .await?;
        serde_json::from_value(value).map_err(|err| Error::Decode(err.to_string()))
    }

    /// Data sources this one was derived from.
    pub async fn get_parents(&self, data_id: u64) -> Result<Vec<DataSource>, Error> {
        let sources = self.list().await?;
        Ok(sources
            .into_iter()
            .filter(|source| source.children.contains(&data_id))
            .collect())
    }

    /// Data sources derived from this one.
    pub async fn get_children(&self, data_id: u64) -> Result<Vec<DataSource>, Error> {
        let sources = self.list().await?;
        Ok(sources
            .into_iter()
            .filter(|source| source.parents.contains(&data_id))
            .collect())
    }

    /// Submit a deletion; completion arrives on the event stream.
    pub async fn delete_event(&self, data_id: u64) -> Result<RequestId, Error> {
        let path = format!("{BASE}/{data_id}");
        command(&self.transport, Method::DELETE, &path, None).await
    }

    /// Delete a data source and wait for the acknowledging event.
    pub async fn delete(&self, data_id: u64) -> Result<(), Error> {
        correlate(&self.stream, || async {
            Ok(self.delete_event(data_id).await?.request_id)
        })
        .await?;
        Ok(())
    }
}
