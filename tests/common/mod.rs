#![allow(dead_code)]

//! In-memory store used by the integration tests.
//!
//! Mimics the API server semantics the coordinator relies on: name
//! uniqueness per namespace, store-assigned resourceVersion/uid/status, 404 on
//! missing names. Every call is counted so tests can assert that nothing hit
//! the store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use database_k8s_api::coordinator::{CoordinatorSettings, DatabaseCoordinator};
use database_k8s_api::crd::ResourceRef;
use database_k8s_api::store::{DatabaseStore, Deletion};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::DynamicObject;
use kube::error::ErrorResponse;

pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.into(),
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
pub struct CallCounts {
    pub get: AtomicUsize,
    pub list: AtomicUsize,
    pub create: AtomicUsize,
    pub delete: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.get.load(Ordering::SeqCst)
            + self.list.load(Ordering::SeqCst)
            + self.create.load(Ordering::SeqCst)
            + self.delete.load(Ordering::SeqCst)
    }
}

/// Increments a counter when dropped, so tests can see that an in-flight
/// call was cancelled.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<BTreeMap<(String, String), DynamicObject>>,
    pub calls: CallCounts,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<(u16, String)>>,
    hang: AtomicBool,
    keep_finalizing: AtomicBool,
    pub cancelled: Arc<AtomicUsize>,
    next_version: AtomicU64,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call sleeps this long before touching the data.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every call fails with an API status of this code.
    pub fn fail_with(&self, code: u16, reason: &str) {
        *self.failure.lock().unwrap() = Some((code, reason.to_string()));
    }

    /// Every call blocks forever.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Deletes mark the object as terminating instead of removing it.
    pub fn keep_finalizing(&self) {
        self.keep_finalizing.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    async fn before_call(&self) -> Result<(), kube::Error> {
        if self.hang.load(Ordering::SeqCst) {
            let _guard = DropGuard(self.cancelled.clone());
            std::future::pending::<()>().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().unwrap().clone();
        if let Some((code, reason)) = failure {
            return Err(api_error(code, &reason, format!("injected {reason}")));
        }
        Ok(())
    }

    fn not_found(reference: &ResourceRef) -> kube::Error {
        api_error(
            404,
            "NotFound",
            format!("databases.dbaas.io \"{}\" not found", reference.name),
        )
    }
}

#[async_trait]
impl DatabaseStore for FakeStore {
    async fn get(&self, reference: &ResourceRef) -> Result<DynamicObject, kube::Error> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;
        self.objects
            .lock()
            .unwrap()
            .get(&(reference.namespace.clone(), reference.name.clone()))
            .cloned()
            .ok_or_else(|| Self::not_found(reference))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<DynamicObject>, kube::Error> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| namespace.map_or(true, |want| want == ns))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        let name = object.metadata.name.clone().unwrap_or_default();
        let mut objects = self.objects.lock().unwrap();
        let key = (namespace.to_string(), name.clone());
        if objects.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("databases.dbaas.io \"{name}\" already exists"),
            ));
        }

        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = object.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.resource_version = Some(version.to_string());
        stored.metadata.uid = Some(format!("uid-{namespace}-{name}"));
        stored.metadata.creation_timestamp = Some(Time(chrono::Utc::now()));
        stored.data["status"] = serde_json::json!({ "phase": "Pending" });

        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, reference: &ResourceRef) -> Result<Deletion, kube::Error> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        let key = (reference.namespace.clone(), reference.name.clone());
        let mut objects = self.objects.lock().unwrap();
        if self.keep_finalizing.load(Ordering::SeqCst) {
            let obj = objects
                .get_mut(&key)
                .ok_or_else(|| Self::not_found(reference))?;
            obj.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
            return Ok(Deletion::Pending(obj.clone()));
        }
        objects
            .remove(&key)
            .map(|_| Deletion::Removed)
            .ok_or_else(|| Self::not_found(reference))
    }

    async fn ping(&self) -> Result<(), kube::Error> {
        self.before_call().await
    }
}

pub fn coordinator(store: Arc<FakeStore>) -> DatabaseCoordinator {
    coordinator_with_timeout(store, Duration::from_secs(5))
}

pub fn coordinator_with_timeout(store: Arc<FakeStore>, timeout: Duration) -> DatabaseCoordinator {
    DatabaseCoordinator::new(
        store,
        CoordinatorSettings {
            default_namespace: "default".to_string(),
            call_timeout: timeout,
        },
    )
}
