//! Kubeconfig resolution and client construction

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use crate::error::{Error, Result};

pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Where the kubeconfig path came from, highest priority first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit(PathBuf),
    Environment(PathBuf),
    Default(PathBuf),
}

impl CredentialSource {
    pub fn path(&self) -> &Path {
        match self {
            CredentialSource::Explicit(p)
            | CredentialSource::Environment(p)
            | CredentialSource::Default(p) => p,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            CredentialSource::Explicit(_) => "explicit path",
            CredentialSource::Environment(_) => "KUBECONFIG",
            CredentialSource::Default(_) => "default location",
        }
    }
}

/// Pick the kubeconfig path: explicit path, then the `KUBECONFIG` value,
/// then `<home>/.kube/config`. Empty values count as unset. When `KUBECONFIG`
/// holds a path list only the first entry is used.
pub fn resolve_kubeconfig_path(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<CredentialSource> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(CredentialSource::Explicit(path.to_path_buf()));
    }

    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        if let Some(first) = std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty()) {
            return Ok(CredentialSource::Environment(first));
        }
    }

    match home.filter(|h| !h.as_os_str().is_empty()) {
        Some(home) => Ok(CredentialSource::Default(home.join(".kube").join("config"))),
        None => Err(Error::Connection(
            "kubeconfig not found, please specify path".to_string(),
        )),
    }
}

/// [`resolve_kubeconfig_path`] against the process environment.
pub fn resolve_from_environment(explicit: Option<&Path>) -> Result<CredentialSource> {
    resolve_kubeconfig_path(
        explicit,
        std::env::var_os(KUBECONFIG_ENV),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

/// Load the kubeconfig at `source` and build a client from it.
///
/// No request is sent; use [`crate::store::KubeStore::connect`] to also
/// validate that the API server answers.
pub async fn load_client(source: &CredentialSource) -> Result<Client> {
    let path = source.path();
    info!("Loading kubeconfig from {} ({})", path.display(), source.describe());

    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| Error::Kubeconfig {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Kubeconfig {
            path: path.to_path_buf(),
            source: e,
        })?;

    Client::try_from(config)
        .map_err(|e| Error::Connection(format!("failed to create Kubernetes client: {e}")))
}
