//! Database custom resource
//!
//! The Database kind is not compiled against a typed schema. It is addressed
//! through a fixed [`ApiResource`] binding and handled as a
//! [`DynamicObject`], so arbitrary structured specs pass through untouched.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: dbaas.io/v1alpha1
//! kind: Database
//! metadata:
//!   name: orders-db
//!   namespace: default
//! spec:
//!   engine: postgres
//!   size: 10Gi
//! status:
//!   phase: Pending
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DATABASE_GROUP: &str = "dbaas.io";
pub const DATABASE_VERSION: &str = "v1alpha1";
pub const DATABASE_API_VERSION: &str = "dbaas.io/v1alpha1";
pub const DATABASE_KIND: &str = "Database";
pub const DATABASE_PLURAL: &str = "databases";

/// Database API resource for dbaas.io/v1alpha1
pub fn database_api_resource() -> ApiResource {
    ApiResource {
        group: DATABASE_GROUP.to_string(),
        version: DATABASE_VERSION.to_string(),
        api_version: DATABASE_API_VERSION.to_string(),
        kind: DATABASE_KIND.to_string(),
        plural: DATABASE_PLURAL.to_string(),
    }
}

/// Address of a single Database in the store.
///
/// Group, version and resource are always the Database constants; only the
/// namespace and name vary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn group(&self) -> &'static str {
        DATABASE_GROUP
    }

    pub fn version(&self) -> &'static str {
        DATABASE_VERSION
    }

    pub fn resource(&self) -> &'static str {
        DATABASE_PLURAL
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            DATABASE_API_VERSION, DATABASE_PLURAL, self.namespace, self.name
        )
    }
}

/// Coarse lifecycle state reported by the store in `status.phase`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabasePhase {
    #[default]
    Pending,
    Ready,
    Failed,
    Deleting,
    /// A phase string this API does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for DatabasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatabasePhase::Pending => "Pending",
            DatabasePhase::Ready => "Ready",
            DatabasePhase::Failed => "Failed",
            DatabasePhase::Deleting => "Deleting",
            DatabasePhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Observed state written by whatever reconciles Database objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DatabasePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Error, Debug, PartialEq)]
#[error("store returned a malformed Database object: {0}")]
pub struct MalformedResource(pub String);

/// A Database as observed in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub name: String,
    pub namespace: String,
    pub spec: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DatabaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl Database {
    /// Effective phase. A pending deletion wins over whatever the status
    /// says, and an object nobody has reconciled yet is Pending.
    pub fn phase(&self) -> DatabasePhase {
        if self.deletion_timestamp.is_some() {
            return DatabasePhase::Deleting;
        }
        self.status
            .as_ref()
            .and_then(|s| s.phase)
            .unwrap_or_default()
    }

    pub fn engine(&self) -> Option<&str> {
        self.spec.get("engine").and_then(Value::as_str)
    }

    pub fn summary(&self) -> DatabaseSummary {
        DatabaseSummary {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            phase: self.phase(),
            engine: self.engine().map(str::to_string),
            uid: self.uid.clone(),
            resource_version: self.resource_version.clone(),
            creation_timestamp: self.creation_timestamp,
        }
    }
}

impl TryFrom<DynamicObject> for Database {
    type Error = MalformedResource;

    fn try_from(obj: DynamicObject) -> Result<Self, Self::Error> {
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| MalformedResource("metadata.name is missing".to_string()))?;
        let namespace = obj
            .namespace()
            .ok_or_else(|| MalformedResource(format!("{name} has no namespace")))?;

        // Status is written by other controllers; an unreadable one is
        // reported as absent rather than failing the whole read.
        let status = obj
            .data
            .get("status")
            .filter(|s| !s.is_null())
            .and_then(|s| serde_json::from_value::<DatabaseStatus>(s.clone()).ok());

        Ok(Database {
            name,
            namespace,
            spec: obj.data.get("spec").cloned().unwrap_or(Value::Null),
            status,
            resource_version: obj.metadata.resource_version.clone(),
            uid: obj.metadata.uid.clone(),
            creation_timestamp: obj.metadata.creation_timestamp.as_ref().map(|t| t.0),
            deletion_timestamp: obj.metadata.deletion_timestamp.as_ref().map(|t| t.0),
        })
    }
}

/// Build the object sent to the store on create. resourceVersion, uid and
/// status are left for the store to assign.
pub fn new_database_object(reference: &ResourceRef, spec: Value) -> DynamicObject {
    let mut obj =
        DynamicObject::new(&reference.name, &database_api_resource()).within(&reference.namespace);
    obj.data = serde_json::json!({ "spec": spec });
    obj
}

/// List entry returned by the list endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub name: String,
    pub namespace: String,
    pub phase: DatabasePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}
