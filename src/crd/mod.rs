//! Custom resource definitions served by the API
//!
//! This module defines the Database kind: its fixed group-version-resource
//! binding, the typed view over dynamic objects, and the CRD manifest.

mod database;
mod manifest;

pub use database::{
    database_api_resource, new_database_object, Database, DatabasePhase, DatabaseStatus,
    DatabaseSummary, MalformedResource, ResourceRef, DATABASE_API_VERSION, DATABASE_GROUP,
    DATABASE_KIND, DATABASE_PLURAL, DATABASE_VERSION,
};
pub use manifest::{database_crd, database_crd_yaml};
