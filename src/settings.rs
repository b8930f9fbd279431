// Runtime settings for the engine, HTTP server and logging

//! # Settings
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. an optional file (`circuit.toml`, `circuit.yaml`, ... via `config`)
//! 3. environment variables prefixed with `CIRCUIT_`, nesting with `__`
//!
//! ```text
//! CIRCUIT_SERVER__PORT=8080
//! CIRCUIT_ENGINE__MAX_COMMIT_ATTEMPTS=5
//! CIRCUIT_LOGGING__JSON=true
//! ```
//!
//! Binaries call `dotenv()` first, so a local `.env` file feeds step 3.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::engine::events::DEFAULT_EVENT_BUFFER;
use crate::{Result, WorkflowError};

/// Prefix of environment variables read by [`Settings::load`]
pub const ENV_PREFIX: &str = "CIRCUIT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Behaviour of the workflow engine itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Compare-and-commit attempts before `ConcurrentModification`
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,

    /// Activate an inactive circuit when a document is assigned to it
    #[serde(default = "default_true")]
    pub activate_on_assign: bool,

    /// Events buffered per subscriber
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_max_commit_attempts(),
            activate_on_assign: true,
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// JSON file with the circuit definitions to serve
    #[serde(default)]
    pub circuits_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            circuits_path: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber
    ///
    /// `RUST_LOG` wins over the configured level.
    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| WorkflowError::Configuration(format!("invalid log filter: {}", e)))?;

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        installed.map_err(|e| {
            WorkflowError::Configuration(format!("logging already initialised: {}", e))
        })
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::build(path).map_err(|e| WorkflowError::Configuration(e.to_string()))
    }

    fn build(path: Option<&str>) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

fn default_true() -> bool {
    true
}

fn default_max_commit_attempts() -> u32 {
    3
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_log_level() -> String {
    "info,document_circuit=debug".to_string()
}
