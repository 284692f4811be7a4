//! Database K8s API
//!
//! An HTTP facade that lists, creates and deletes `Database` custom resources
//! stored in a Kubernetes API server.
//!
//! Requests flow from [`rest_api`] through the [`coordinator`], which applies
//! validation, deadlines and error classification, to the [`store`] adapter
//! that talks to the API server.

pub mod config;
pub mod coordinator;
pub mod crd;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod rest_api;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
