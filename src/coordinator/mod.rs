//! Resource lifecycle coordinator
//!
//! Turns list/get/create/delete intents into store calls and normalizes the
//! results. The coordinator is stateless: the store is the single source of
//! truth and the only serialization point for name uniqueness, so requests are
//! never queued or retried here.
//!
//! Every store call runs under a deadline. Dropping a coordinator future (for
//! example because the HTTP client went away) drops the outbound request with
//! it.

mod outcome;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::crd::{new_database_object, Database, DatabasePhase, ResourceRef};
use crate::store::{DatabaseStore, Deletion};

pub use outcome::{classify, ErrorKind, LifecycleError, Operation, Scope};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings the coordinator needs from server configuration.
#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    /// Namespace used when a request does not name one.
    pub default_namespace: String,
    /// Deadline applied to every store call.
    pub call_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Desired state for a new Database.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateDatabase {
    pub namespace: Option<String>,
    pub name: String,
    pub spec: Option<Value>,
}

/// Acknowledgement that the store accepted a delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteAccepted {
    pub reference: ResourceRef,
    /// The object is still visible while the store finalizes it.
    pub pending_finalization: bool,
}

impl DeleteAccepted {
    pub fn phase(&self) -> Option<DatabasePhase> {
        self.pending_finalization.then_some(DatabasePhase::Deleting)
    }
}

/// One lifecycle request, as handed to [`DatabaseCoordinator::execute`].
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    List { namespace: Option<String> },
    Get { namespace: Option<String>, name: String },
    Create(CreateDatabase),
    Delete { namespace: Option<String>, name: String },
}

impl Intent {
    pub fn operation(&self) -> Operation {
        match self {
            Intent::List { .. } => Operation::List,
            Intent::Get { .. } => Operation::Get,
            Intent::Create(_) => Operation::Create,
            Intent::Delete { .. } => Operation::Delete,
        }
    }
}

/// Successful result of an [`Intent`].
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Listed(Vec<Database>),
    Found(Database),
    Created(Database),
    DeleteAccepted(DeleteAccepted),
}

pub struct DatabaseCoordinator {
    store: Arc<dyn DatabaseStore>,
    settings: CoordinatorSettings,
}

impl DatabaseCoordinator {
    pub fn new(store: Arc<dyn DatabaseStore>, settings: CoordinatorSettings) -> Self {
        Self { store, settings }
    }

    pub async fn execute(&self, intent: Intent) -> Result<Outcome, LifecycleError> {
        match intent {
            Intent::List { namespace } => self.list(namespace.as_deref()).await.map(Outcome::Listed),
            Intent::Get { namespace, name } => self
                .get(namespace.as_deref(), &name)
                .await
                .map(Outcome::Found),
            Intent::Create(request) => self.create(request).await.map(Outcome::Created),
            Intent::Delete { namespace, name } => self
                .delete(namespace.as_deref(), &name)
                .await
                .map(Outcome::DeleteAccepted),
        }
    }

    /// List Databases in `namespace`, or in every namespace when the filter is
    /// absent or empty. Results are ordered by namespace then name.
    #[instrument(skip(self))]
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<Database>, LifecycleError> {
        let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());
        let scope = Scope::Namespace(namespace.map(str::to_string));

        let result: Result<Vec<Database>, LifecycleError> = async {
            let objects = self
                .call(Operation::List, &scope, self.store.list(namespace))
                .await?;
            let mut databases = objects
                .into_iter()
                .map(|obj| self.convert(Operation::List, &scope, obj))
                .collect::<Result<Vec<_>, _>>()?;
            databases.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
            debug!("Listed {} databases", databases.len());
            Ok(databases)
        }
        .await;

        record(Operation::List, &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Database, LifecycleError> {
        let result: Result<Database, LifecycleError> = async {
            let reference = self.reference(Operation::Get, namespace, name)?;
            let scope = Scope::Resource(reference.clone());
            let obj = self
                .call(Operation::Get, &scope, self.store.get(&reference))
                .await?;
            self.convert(Operation::Get, &scope, obj)
        }
        .await;

        record(Operation::Get, &result);
        result
    }

    /// Create a Database. Exactly one store mutation is attempted; a name
    /// that already exists comes back as [`ErrorKind::Conflict`].
    #[instrument(skip(self, request), fields(name = %request.name, namespace = ?request.namespace))]
    pub async fn create(&self, request: CreateDatabase) -> Result<Database, LifecycleError> {
        let result: Result<Database, LifecycleError> = async {
            let reference =
                self.reference(Operation::Create, request.namespace.as_deref(), &request.name)?;
            let scope = Scope::Resource(reference.clone());
            let spec = validate_spec(request.spec)
                .map_err(|msg| LifecycleError::validation(Operation::Create, &scope, msg))?;

            let object = new_database_object(&reference, spec);
            let created = self
                .call(
                    Operation::Create,
                    &scope,
                    self.store.create(&reference.namespace, &object),
                )
                .await?;
            let database = self.convert(Operation::Create, &scope, created)?;
            info!(
                "Created database {} (resourceVersion {:?})",
                reference,
                database.resource_version
            );
            Ok(database)
        }
        .await;

        record(Operation::Create, &result);
        result
    }

    /// Ask the store to delete a Database. Completion of finalization is not
    /// awaited. A missing name is [`ErrorKind::NotFound`], never success.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DeleteAccepted, LifecycleError> {
        let result: Result<DeleteAccepted, LifecycleError> = async {
            let reference = self.reference(Operation::Delete, namespace, name)?;
            let scope = Scope::Resource(reference.clone());
            let deletion = self
                .call(Operation::Delete, &scope, self.store.delete(&reference))
                .await?;
            let pending_finalization = matches!(deletion, Deletion::Pending(_));
            info!(
                "Delete of {} accepted (pending finalization: {})",
                reference, pending_finalization
            );
            Ok(DeleteAccepted {
                reference,
                pending_finalization,
            })
        }
        .await;

        record(Operation::Delete, &result);
        result
    }

    /// Whether the store currently answers within the deadline. Timed under
    /// its own `ping` label so probes stay out of the list latency series.
    pub async fn ready(&self) -> Result<(), LifecycleError> {
        let scope = Scope::Namespace(None);
        self.call(Operation::Ping, &scope, self.store.ping()).await
    }

    fn reference(
        &self,
        operation: Operation,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceRef, LifecycleError> {
        let namespace = namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.settings.default_namespace);
        let reference = ResourceRef::new(namespace, name);
        if name.trim().is_empty() {
            return Err(LifecycleError::validation(
                operation,
                &Scope::Resource(reference),
                "name is required",
            ));
        }
        Ok(reference)
    }

    fn convert(
        &self,
        operation: Operation,
        scope: &Scope,
        obj: kube::api::DynamicObject,
    ) -> Result<Database, LifecycleError> {
        Database::try_from(obj).map_err(|e| {
            LifecycleError::new(ErrorKind::StoreUnavailable, operation, scope, e.to_string())
        })
    }

    async fn call<T, F>(
        &self,
        operation: Operation,
        scope: &Scope,
        fut: F,
    ) -> Result<T, LifecycleError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.settings.call_timeout, fut).await;
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        crate::metrics::observe_store_call(operation, elapsed.as_secs_f64());

        match result {
            Ok(Ok(value)) => {
                debug!("Store {} answered in {:?}", operation, elapsed);
                Ok(value)
            }
            Ok(Err(e)) => {
                let err = LifecycleError::from_store(operation, scope, &e);
                warn!("Store {} failed: {}", operation, err);
                Err(err)
            }
            Err(_) => {
                let err = LifecycleError::new(
                    ErrorKind::Timeout,
                    operation,
                    scope,
                    format!(
                        "store did not answer within {}ms",
                        self.settings.call_timeout.as_millis()
                    ),
                );
                warn!("Store {} timed out: {}", operation, err);
                Err(err)
            }
        }
    }
}

/// A spec must be a non-empty JSON object.
fn validate_spec(spec: Option<Value>) -> Result<Value, String> {
    match spec {
        None | Some(Value::Null) => Err("spec is required".to_string()),
        Some(Value::Object(map)) if map.is_empty() => Err("spec must not be empty".to_string()),
        Some(spec @ Value::Object(_)) => Ok(spec),
        Some(_) => Err("spec must be a JSON object".to_string()),
    }
}

fn record<T>(operation: Operation, result: &Result<T, LifecycleError>) {
    #[cfg(feature = "metrics")]
    crate::metrics::record_request(
        operation,
        match result {
            Ok(_) => "ok",
            Err(e) => e.kind.as_str(),
        },
    );
    #[cfg(not(feature = "metrics"))]
    let _ = (operation, result);
}
