//! Outcome contract of the coordinator
//!
//! Every store failure is folded into exactly one [`ErrorKind`]. Nothing
//! store-specific leaves this module.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::crd::ResourceRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
    /// Readiness round trip; never part of a lifecycle intent.
    Ping,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Ping => "ping",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The intent is structurally invalid, or the store rejected its content.
    Validation,
    NotFound,
    /// Name already taken, or a concurrent write changed resourceVersion.
    Conflict,
    /// No answer within the call deadline.
    Timeout,
    /// Store unreachable or failing on its side.
    StoreUnavailable,
    Forbidden,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::StoreUnavailable => "StoreUnavailable",
            ErrorKind::Forbidden => "Forbidden",
        }
    }

    /// Whether the caller may reasonably retry the same intent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Conflict | ErrorKind::Timeout | ErrorKind::StoreUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one lifecycle intent.
#[derive(Error, Clone, Debug, PartialEq)]
pub struct LifecycleError {
    pub kind: ErrorKind,
    pub operation: Operation,
    /// Namespace the operation was scoped to; `None` for cluster-wide lists.
    pub namespace: Option<String>,
    /// Resource name; `None` for lists.
    pub name: Option<String>,
    pub message: String,
}

impl LifecycleError {
    pub fn new(
        kind: ErrorKind,
        operation: Operation,
        scope: &Scope,
        message: impl Into<String>,
    ) -> Self {
        let (namespace, name) = match scope {
            Scope::Namespace(ns) => (ns.clone(), None),
            Scope::Resource(r) => (Some(r.namespace.clone()), Some(r.name.clone())),
        };
        Self {
            kind,
            operation,
            namespace,
            name,
            message: message.into(),
        }
    }

    pub fn validation(operation: Operation, scope: &Scope, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, operation, scope, message)
    }

    pub fn from_store(operation: Operation, scope: &Scope, err: &kube::Error) -> Self {
        let (kind, message) = classify(err);
        Self::new(kind, operation, scope, message)
    }

    pub fn reference(&self) -> Option<ResourceRef> {
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => Some(ResourceRef::new(ns.clone(), name.clone())),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn target(&self) -> String {
        if self.operation == Operation::Ping {
            return "API server".to_string();
        }
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => format!("{ns}/{name}"),
            (Some(ns), None) => format!("namespace {ns}"),
            _ => "all namespaces".to_string(),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} failed ({}): {}",
            self.operation,
            self.target(),
            self.kind,
            self.message
        )
    }
}

/// What an operation was addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Namespace(Option<String>),
    Resource(ResourceRef),
}

/// Fold a store error into a kind plus the message to surface.
///
/// API status responses keep the server's message verbatim.
pub fn classify(err: &kube::Error) -> (ErrorKind, String) {
    match err {
        kube::Error::Api(resp) => {
            let kind = match resp.code {
                400 | 422 => ErrorKind::Validation,
                401 | 403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                408 | 504 => ErrorKind::Timeout,
                _ => ErrorKind::StoreUnavailable,
            };
            (kind, resp.message.clone())
        }
        other if is_timed_out(other) => (ErrorKind::Timeout, other.to_string()),
        other => (ErrorKind::StoreUnavailable, other.to_string()),
    }
}

/// Transport timeouts surface as an io::Error somewhere down the source chain.
fn is_timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}
