//! Store client adapter
//!
//! Access to the Kubernetes API server for the Database kind. Consumers depend
//! on the [`DatabaseStore`] trait; [`KubeStore`] is the production
//! implementation backed by [`kube`], and tests swap in fakes.
//!
//! Errors are returned as raw [`kube::Error`] values. Classifying them is the
//! coordinator's job.

mod credentials;
mod kube_store;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::crd::ResourceRef;

pub use credentials::{
    load_client, resolve_from_environment, resolve_kubeconfig_path, CredentialSource,
    KUBECONFIG_ENV,
};
pub use kube_store::KubeStore;

/// What the store answered to a delete request.
#[derive(Clone, Debug)]
pub enum Deletion {
    /// The object is still present while finalizers run.
    Pending(DynamicObject),
    /// The store reports the object as removed.
    Removed,
}

/// Operations the API needs from the resource store, bound to the Database
/// group-version-resource.
///
/// Implementations must be safe for unbounded concurrent use.
#[async_trait]
pub trait DatabaseStore: Send + Sync {
    async fn get(&self, reference: &ResourceRef) -> Result<DynamicObject, kube::Error>;

    /// Lists Databases in `namespace`, or across all namespaces for `None`.
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<DynamicObject>, kube::Error>;

    async fn create(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error>;

    async fn delete(&self, reference: &ResourceRef) -> Result<Deletion, kube::Error>;

    /// Cheap round trip used for readiness.
    async fn ping(&self) -> Result<(), kube::Error>;
}
