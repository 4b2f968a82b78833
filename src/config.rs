// ABOUTME: Configuration structures and parsing for the manifest, SSH and output locations
// ABOUTME: Defaults reproduce the fixed CloudLab layout; an optional TOML file may override them

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SshConfig {
    #[serde(default = "default_ssh_config_path")]
    pub config_path: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_domain_suffix")]
    pub domain_suffix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_node_list")]
    pub node_list: String,
    #[serde(default = "default_addr_list")]
    pub addr_list: String,
}

fn default_manifest_path() -> String {
    "manifest.xml".to_string()
}

fn default_ssh_config_path() -> String {
    "~/.ssh/config".to_string()
}

fn default_user() -> String {
    "junzhig".to_string()
}

fn default_domain_suffix() -> String {
    ".utah.cloudlab.us".to_string()
}

fn default_node_list() -> String {
    "node_list".to_string()
}

fn default_addr_list() -> String {
    "addr_list".to_string()
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            config_path: default_ssh_config_path(),
            user: default_user(),
            domain_suffix: default_domain_suffix(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            node_list: default_node_list(),
            addr_list: default_addr_list(),
        }
    }
}

impl Config {
    pub fn default_config_content() -> &'static str {
        r#"# cloudlab-hosts configuration
# Every key is optional; missing keys fall back to the values shown here.

[manifest]
# Experiment manifest, relative to the working directory
path = "manifest.xml"

[ssh]
# SSH client configuration that receives one Host block per node (append only)
config_path = "~/.ssh/config"
# Login name written as the User of every Host block
user = "junzhig"
# Appended to each virtual node name to form its HostName
domain_suffix = ".utah.cloudlab.us"

[output]
# One client_id per line (overwritten on each run)
node_list = "node_list"
# One fully qualified address per line (overwritten on each run)
addr_list = "addr_list"
"#
    }

    /// Load the user's configuration file if one exists, otherwise the defaults.
    /// The result has its paths expanded and has been validated.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_config_path() {
            Ok(path) if path.exists() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from_file(&path)?
            }
            Ok(path) => {
                tracing::debug!(
                    "No configuration file at {}, using defaults:\n{}",
                    path.display(),
                    Self::default_config_content()
                );
                Self::default()
            }
            Err(e) => {
                tracing::debug!("{e:#}, using defaults");
                Self::default()
            }
        };

        config.expand_path()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::load_from_str(&content)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("cloudlab-hosts").join("config.toml"))
    }

    pub fn expand_path(&mut self) -> Result<()> {
        self.ssh.config_path = expand_tilde(&self.ssh.config_path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest.path.is_empty() {
            anyhow::bail!("Manifest path cannot be empty");
        }

        if self.ssh.config_path.is_empty() {
            anyhow::bail!("SSH config path cannot be empty");
        }

        if self.ssh.user.is_empty() || self.ssh.user.chars().any(char::is_whitespace) {
            anyhow::bail!("SSH user must be a non-empty name without whitespace");
        }

        if self.output.node_list.is_empty() || self.output.addr_list.is_empty() {
            anyhow::bail!("Output paths cannot be empty");
        }

        if self.output.node_list == self.output.addr_list {
            anyhow::bail!("node_list and addr_list must be different files");
        }

        Ok(())
    }
}

fn expand_tilde(path: &str) -> Result<String> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(rest).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}
