// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/tasks";

/// Prefix of the environment variables that override the configuration,
/// e.g. `TASKS_API_BASE_URL` or `TASKS_API_TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "TASKS_API";

/// Settings for reaching the task API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Root of the task collection, e.g. `http://localhost:8080/api/tasks`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl ApiConfig {
    /// A configuration pointing at `base_url` with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration from defaults, then the optional file, then the
    /// `TASKS_API_*` environment variables. Later layers win.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout_secs", default_timeout_secs() as i64)?
            .set_default("connect_timeout_secs", default_connect_timeout_secs() as i64)?;

        if let Some(path) = path {
            debug!("Reading API configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(env)
            .build()
            .context("Failed to assemble API configuration")?;

        let config: ApiConfig = settings
            .try_deserialize()
            .context("Failed to parse API configuration")?;
        config.validate()?;

        info!("Task API configured at {}", config.base_url);
        Ok(config)
    }

    /// Checks that the base URL can address the task collection and that the
    /// timeouts are usable.
    pub fn validate(&self) -> Result<()> {
        let url = self.parsed_base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base_url must use http or https, got `{}`", url.scheme());
        }
        if url.cannot_be_a_base() {
            bail!("base_url `{}` cannot carry a path", self.base_url);
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        if self.connect_timeout_secs == 0 {
            bail!("connect_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base_url `{}`", self.base_url))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
