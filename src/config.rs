use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vcenter: Option<VcenterConfig>,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vcenter: None,
            shell: ShellConfig::default(),
            daemon: DaemonConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcenterConfig {
    pub host: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Known product version; controls newer than this report SKIPPED.
    #[serde(default)]
    pub product_version: Option<semver::Version>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Allow shell-backed controls to run commands on this machine.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            log_level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_http_addr() -> String {
    "127.0.0.1:9200".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("vcompliance").join("config.yaml"))
    }
}

/// Load configuration: defaults, then the YAML file, then
/// `VCOMPLIANCE_*` environment variables (`__` separates nested keys,
/// e.g. `VCOMPLIANCE_VCENTER__PASSWORD`).
///
/// An explicit path must exist; the default path is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file {} does not exist", p.display());
            }
            p.to_path_buf()
        }
        None => Config::path()?,
    };

    figment_for(&path)
        .merge(Env::prefixed("VCOMPLIANCE_").split("__"))
        .extract()
        .with_context(|| format!("loading configuration from {}", path.display()))
}

fn figment_for(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(Config::default())).merge(Yaml::file(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Config = figment_for(&dir.path().join("absent.yaml")).extract().unwrap();
        assert!(cfg.vcenter.is_none());
        assert!(!cfg.shell.enabled);
        assert_eq!(cfg.daemon.http_addr, "127.0.0.1:9200");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn yaml_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "vcenter:\n  host: vc01.lab\n  username: admin\n  product_version: 8.0.2\nshell:\n  enabled: true\n",
        )
        .unwrap();

        let cfg = load(Some(&path)).unwrap();
        let vc = cfg.vcenter.unwrap();
        assert_eq!(vc.host, "vc01.lab");
        assert!(vc.verify_tls);
        assert_eq!(vc.timeout_secs, 30);
        assert_eq!(vc.product_version, Some(semver::Version::new(8, 0, 2)));
        assert!(cfg.shell.enabled);
        assert_eq!(cfg.daemon.log_level, "info");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
