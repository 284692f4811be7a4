use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::{debug, info, instrument};

use super::credentials::{load_client, resolve_from_environment};
use super::{DatabaseStore, Deletion};
use crate::crd::{database_api_resource, ResourceRef};
use crate::error::{Error, Result};

/// [`DatabaseStore`] backed by a live API server.
///
/// The single [`Client`] is both the typed client for built-in kinds and the
/// transport for the dynamic Database API. Cloning is cheap and clones share
/// the connection pool.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    resource: ApiResource,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: database_api_resource(),
        }
    }

    /// Resolve credentials, build the client and check that the API server
    /// answers within `timeout`. Any failure is a [`Error::Connection`]-class
    /// error.
    pub async fn connect(explicit_kubeconfig: Option<&Path>, timeout: Duration) -> Result<Self> {
        let source = resolve_from_environment(explicit_kubeconfig)?;
        let client = load_client(&source).await?;

        let version = tokio::time::timeout(timeout, client.apiserver_version())
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "API server from {} did not answer within {}ms",
                    source.path().display(),
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| {
                Error::Connection(format!(
                    "API server from {} did not answer: {e}",
                    source.path().display()
                ))
            })?;
        info!(
            "Connected to Kubernetes API server {}.{} ({})",
            version.major, version.minor, version.git_version
        );

        Ok(Self::new(client))
    }

    fn namespaced(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }
}

#[async_trait]
impl DatabaseStore for KubeStore {
    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn get(&self, reference: &ResourceRef) -> Result<DynamicObject, kube::Error> {
        self.namespaced(&reference.namespace).get(&reference.name).await
    }

    #[instrument(skip(self))]
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<DynamicObject>, kube::Error> {
        let api = match namespace {
            Some(ns) => self.namespaced(ns),
            None => Api::all_with(self.client.clone(), &self.resource),
        };
        let list = api.list(&ListParams::default()).await?;
        debug!(
            "Listed {} databases at resourceVersion {:?}",
            list.items.len(),
            list.metadata.resource_version
        );
        Ok(list.items)
    }

    #[instrument(skip(self, object))]
    async fn create(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        self.namespaced(namespace)
            .create(&PostParams::default(), object)
            .await
    }

    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn delete(&self, reference: &ResourceRef) -> Result<Deletion, kube::Error> {
        let response = self
            .namespaced(&reference.namespace)
            .delete(&reference.name, &DeleteParams::default())
            .await?;
        Ok(response.either(Deletion::Pending, |_status| Deletion::Removed))
    }

    async fn ping(&self) -> Result<(), kube::Error> {
        self.client.apiserver_version().await.map(|_| ())
    }
}
