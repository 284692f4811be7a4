//! Command line and environment configuration

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::coordinator::CoordinatorSettings;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "database-api", version, about = "HTTP API for Database custom resources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Run(RunArgs),
    /// Print the Database CustomResourceDefinition as YAML
    Crd,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to a kubeconfig file. Takes priority over KUBECONFIG and ~/.kube/config
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: IpAddr,

    /// Namespace used when a request does not name one
    #[arg(long, env = "DEFAULT_NAMESPACE", default_value = "default")]
    pub default_namespace: String,

    /// Deadline for every call to the Kubernetes API server
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 10)]
    pub store_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl RunArgs {
    /// Reject settings that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.store_timeout_secs == 0 {
            return Err(Error::ConfigError(
                "store timeout must be greater than zero".to_string(),
            ));
        }
        if self.default_namespace.trim().is_empty() {
            return Err(Error::ConfigError(
                "default namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            default_namespace: self.default_namespace.trim().to_string(),
            call_timeout: Duration::from_secs(self.store_timeout_secs),
        }
    }
}
