use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::JenkinsError;

/// Configuration file structure.
///
/// Loaded from `--config`, or from `~/.jenkins.yaml` (also `.yml`, `.toml`, `.json`).
/// Values given on the command line or through `JENKINS_*` environment variables win
/// over anything in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Jenkins server URL
    pub host: Option<String>,

    /// Jenkins username
    pub user: Option<String>,

    /// Jenkins API key
    pub key: Option<String>,

    /// Pipeline (job) to operate on
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Whole-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub products: ProductsConfig,

    #[serde(default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductsConfig {
    #[serde(default = "default_rs_product")]
    pub rs: ProductConfig,

    #[serde(default = "default_pra_product")]
    pub pra: ProductConfig,
}

/// How a product is named in build parameters and in output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductConfig {
    /// Value of the `PRODUCT` build parameter
    #[serde(alias = "search_name")]
    pub search_name: String,

    /// Name shown to the user
    #[serde(alias = "display_name")]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentConfig {
    /// Parent domain that `push` deploys subdomains under
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            key: None,
            pipeline: default_pipeline(),
            timeout_secs: default_timeout_secs(),
            products: ProductsConfig::default(),
            deployment: DeploymentConfig::default(),
        }
    }
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            rs: default_rs_product(),
            pra: default_pra_product(),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
        }
    }
}

fn default_pipeline() -> String {
    "master".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_rs_product() -> ProductConfig {
    ProductConfig {
        search_name: "ingredi".to_string(),
        display_name: "RS".to_string(),
    }
}

fn default_pra_product() -> ProductConfig {
    ProductConfig {
        search_name: "bpam".to_string(),
        display_name: "PRA".to_string(),
    }
}

fn default_domain() -> String {
    "dev.bomgar.com".to_string()
}

const CANDIDATES: [&str; 4] = [
    ".jenkins.yaml",
    ".jenkins.yml",
    ".jenkins.toml",
    ".jenkins.json",
];

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the home directory is searched for
    /// the default file names; finding none yields the defaults.
    ///
    /// Returns the configuration together with the file it came from, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = path {
            let config = Self::load_from_path(path)?;
            return Ok((config, Some(path.to_path_buf())));
        }

        match dirs::home_dir() {
            Some(home) => Self::load_from_dir(&home),
            None => Ok((Self::default(), None)),
        }
    }

    /// Search `dir` for the first default config file name.
    pub fn load_from_dir(dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        for candidate in &CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                let config = Self::load_from_path(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => serde_yaml::from_str(&contents)
                .or_else(|_| toml::from_str(&contents))
                .or_else(|_| serde_json::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Merge command-line/environment overrides and validate credentials.
    pub fn resolve(self, overrides: Overrides) -> crate::error::Result<Settings> {
        let host = non_empty(overrides.host).or_else(|| non_empty(self.host));
        let user = non_empty(overrides.user).or_else(|| non_empty(self.user));
        let key = non_empty(overrides.key).or_else(|| non_empty(self.key));

        let Some(host) = host else {
            return Err(JenkinsError::Config("you must provide a host".to_string()));
        };
        let (Some(user), Some(key)) = (user, key) else {
            return Err(JenkinsError::auth(
                "you must provide both a username and an API key",
            ));
        };

        Ok(Settings {
            host,
            user,
            key,
            pipeline: non_empty(overrides.pipeline).unwrap_or(self.pipeline),
            timeout: Duration::from_secs(self.timeout_secs),
            products: self.products,
            deployment_domain: self.deployment.domain,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub key: Option<String>,
    pub pipeline: Option<String>,
}

/// Fully resolved settings threaded through every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub user: String,
    pub key: String,
    pub pipeline: String,
    pub timeout: Duration,
    pub products: ProductsConfig,
    pub deployment_domain: String,
}

impl ProductsConfig {
    /// Resolve a user-supplied product (`rs`, `pra`, or a search name) to its config.
    pub fn resolve(&self, name: &str) -> crate::error::Result<&ProductConfig> {
        let lower = name.to_lowercase();
        if lower == "rs" || lower == self.rs.search_name {
            Ok(&self.rs)
        } else if lower == "pra" || lower == self.pra.search_name {
            Ok(&self.pra)
        } else {
            Err(JenkinsError::validation(
                "product",
                name,
                &format!(
                    "must be '{}', '{}', 'rs', or 'pra'",
                    self.rs.search_name, self.pra.search_name
                ),
            ))
        }
    }
}
