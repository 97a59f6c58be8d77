//! Response bodies, deserialized from the snake-cased wire payloads.
//!
//! Every struct tolerates missing optional fields so that a partially
//! populated event payload still decodes into something usable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Acknowledgement returned by every command endpoint; the id correlates
/// the command with a later event on the shared stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestId {
    /// Opaque correlation token.
    pub request_id: String,
}

/// Category of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataSourceKind {
    /// Atomic structure definition
    Structure,
    /// Output of a calculation
    Calculation,
    /// Computed property record
    Property,
    /// Workflow definition
    Workflow,
    /// Diffraction pattern
    Pattern,
    /// Free-form user input
    UserInput,
}

impl TryFrom<u8> for DataSourceKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Structure),
            2 => Ok(Self::Calculation),
            3 => Ok(Self::Property),
            4 => Ok(Self::Workflow),
            5 => Ok(Self::Pattern),
            6 => Ok(Self::UserInput),
            other => Err(format!("unknown data source kind {other}")),
        }
    }
}

impl From<DataSourceKind> for u8 {
    fn from(kind: DataSourceKind) -> Self {
        match kind {
            DataSourceKind::Structure => 1,
            DataSourceKind::Calculation => 2,
            DataSourceKind::Property => 3,
            DataSourceKind::Workflow => 4,
            DataSourceKind::Pattern => 5,
            DataSourceKind::UserInput => 6,
        }
    }
}

/// A stored piece of user data together with its lineage.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSource {
    /// Server-assigned identifier
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Raw content body
    #[serde(default)]
    pub content: String,
    /// Which category of data this is
    #[serde(rename = "type")]
    pub kind: DataSourceKind,
    /// Ids of the data sources this one was derived from
    #[serde(default)]
    pub parents: Vec<u64>,
    /// Ids of the data sources derived from this one
    #[serde(default)]
    pub children: Vec<u64>,
    /// Owning account id
    #[serde(default)]
    pub user_id: u64,
    /// Owner's first name
    #[serde(default)]
    pub user_first_name: String,
    /// Owner's last name
    #[serde(default)]
    pub user_last_name: String,
    /// Owner's email address
    #[serde(default)]
    pub user_email: String,
    /// Collections this data source belongs to
    #[serde(default)]
    pub collections: Vec<Collection>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Content-only view of a data source, fetched directly over HTTP rather
/// than through the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataSourceContent {
    /// Raw content body
    pub content: String,
}

/// A calculation scheduled against a data source.
#[derive(Debug, Clone, Deserialize)]
pub struct Calculation {
    /// Server-assigned identifier
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Owning account id
    #[serde(default)]
    pub user_id: u64,
    /// Completion percentage, 0 through 100
    #[serde(default)]
    pub progress: u32,
    /// Data source the calculation was started from.
    #[serde(default)]
    pub parent: u64,
    /// Result data sources, present once the calculation finished.
    #[serde(default)]
    pub result: Option<Vec<DataSource>>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A calculation engine advertised by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Engine {
    /// Input template the engine expects
    #[serde(default)]
    pub template: Option<String>,
    /// Parameter schema, verbatim from the backend
    #[serde(default)]
    pub schema: Option<Value>,
    /// Example input accepted by the engine
    #[serde(default)]
    pub input: Option<String>,
}

/// Who may see a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionVisibility {
    /// Visible to the owner only
    #[default]
    Private,
    /// Visible to the users it is shared with
    Shared,
    /// Visible to everyone
    Community,
}

/// A collection type (slug, label, flavor).
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionKind {
    /// Server-assigned identifier
    pub id: u64,
    /// Machine-readable name
    #[serde(default)]
    pub slug: String,
    /// Human-readable name
    #[serde(default)]
    pub label: String,
    /// Presentation hint for the frontend
    #[serde(default)]
    pub flavor: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A named grouping of data sources shared with a set of users.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    /// Server-assigned identifier
    pub id: u64,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Id of the collection type
    #[serde(default)]
    pub type_id: u64,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Who may see this collection
    #[serde(default)]
    pub visibility: CollectionVisibility,
    /// Ids of the data sources it contains
    #[serde(default)]
    pub data_sources: Vec<u64>,
    /// Ids of the users it is shared with
    #[serde(default)]
    pub users: Vec<u64>,
    /// Owning account id
    #[serde(default)]
    pub user_id: u64,
    /// Owner's first name
    #[serde(default)]
    pub user_first_name: Option<String>,
    /// Owner's last name
    #[serde(default)]
    pub user_last_name: Option<String>,
    /// Machine-readable name of the collection type
    #[serde(default)]
    pub type_slug: Option<String>,
    /// Human-readable name of the collection type
    #[serde(default)]
    pub type_label: Option<String>,
    /// Presentation hint of the collection type
    #[serde(default)]
    pub type_flavor: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for creating or editing a collection. An `id` turns the
/// call into an edit of the existing collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionCreate {
    /// Display title
    pub title: String,
    /// Id of the collection type
    pub type_id: u64,
    /// Existing collection to edit instead of creating one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Who may see the collection
    pub visibility: CollectionVisibility,
    /// Ids of the data sources to include
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<u64>,
    /// Ids of the users to share with
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<u64>,
}

impl CollectionCreate {
    #[must_use]
    pub const fn new(title: String, type_id: u64) -> Self {
        Self {
            title,
            type_id,
            id: None,
            description: None,
            visibility: CollectionVisibility::Private,
            data_sources: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// The authenticated account.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Server-assigned identifier
    pub id: u64,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the email address was confirmed
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Human-readable role name
    #[serde(default)]
    pub role_label: Option<String>,
    /// Machine-readable role name
    #[serde(default)]
    pub role_slug: Option<String>,
    /// Per-resource permission grants
    #[serde(default)]
    pub permissions: Option<HashMap<String, String>>,
    /// Identity provider the account came from
    #[serde(default)]
    pub provider: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
