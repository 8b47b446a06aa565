use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::home_dir::resolve_home_dir;

/// Environment variables the hosted table credentials fall back to.
pub const STORE_URL_ENV: &str = "SUPABASE_URL";
pub const STORE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Core server configuration.
    pub server: ServerConfig,
    /// Hosted table connection (optional in files, required to serve real data).
    pub store: Option<StoreConfig>,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // will be normalized to absolute path
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub timeout_sec: u64,
}

/// Credentials for the hosted `user_data` table (Supabase REST endpoint).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Service role key; never printed back.
    #[serde(default, serialize_with = "redact")]
    pub service_role_key: String,
}

fn redact<S: Serializer>(value: &str, s: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        s.serialize_str("")
    } else {
        s.serialize_str("<redacted>")
    }
}

impl StoreConfig {
    /// Fill empty fields from `SUPABASE_URL` / `SUPABASE_SERVICE_ROLE_KEY`.
    pub fn fill_from_env(&mut self) {
        self.fill_from(|key| std::env::var(key).ok());
    }

    fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.url.trim().is_empty() {
            if let Some(url) = lookup(STORE_URL_ENV) {
                self.url = url;
            }
        }
        if self.service_role_key.trim().is_empty() {
            if let Some(key) = lookup(STORE_KEY_ENV) {
                self.service_role_key = key;
            }
        }
    }

    /// Fail fast when credentials are missing or the URL is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() || self.service_role_key.trim().is_empty() {
            bail!(
                "store credentials not found: set store.url/store.service_role_key or {} and {}",
                STORE_URL_ENV,
                STORE_KEY_ENV
            );
        }
        url::Url::parse(self.url.trim())
            .with_context(|| format!("invalid store url '{}'", self.url))?;
        Ok(())
    }
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/api.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => platform default from resolve_home_dir()
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            timeout_sec: 0,
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/student-portal.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: None,
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Layered loading: defaults → YAML file → `APP__`-prefixed environment.
    /// `server.home_dir` is normalized into an absolute path and created.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        if !config_path.as_ref().is_file() {
            bail!("config file not found: {}", config_path.as_ref().display());
        }

        // Optional sections stay None unless YAML/ENV provides them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // APP__SERVER__PORT=8000 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("Failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML (secrets redacted).
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(),
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Store section with environment fallbacks applied.
    pub fn resolved_store(&self) -> StoreConfig {
        let mut store = self.store.clone().unwrap_or_default();
        store.fill_from_env();
        store
    }

    /// Typed view of a module's entry in the `modules` bag.
    /// A missing entry yields `T::default()`; a malformed one is an error.
    pub fn module_config<T>(&self, module_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(module_name) {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("invalid config for module '{module_name}'")),
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

const fn default_subdir() -> &'static str {
    ".student-portal"
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let opt = if server.home_dir.trim().is_empty() {
        None
    } else {
        Some(server.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(opt, default_subdir(), true)
        .context("home_dir normalization failed")?;

    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let raw = fs::read_to_string(&path)?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid module file {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::tempdir;

    fn is_normalized_path(p: &str) -> bool {
        let pb = PathBuf::from(p);
        pb.is_absolute() && !p.starts_with('~')
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.home_dir, "");
        assert!(config.store.is_none());

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/student-portal.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_reads_store_and_modules() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("home");

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090
  timeout_sec: 30

store:
  url: "https://demo.supabase.co"
  service_role_key: "secret"

modules:
  student_portal:
    table: "user_data"
"#,
            home.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(is_normalized_path(&config.server.home_dir));
        assert!(home.exists());
        assert_eq!(config.server.port, 9090);

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.url, "https://demo.supabase.co");
        assert_eq!(store.service_role_key, "secret");
        assert!(store.validate().is_ok());

        assert_eq!(config.modules["student_portal"]["table"], "user_data");
        // optional logging stays None when not provided
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_modules_dir_merges_yaml_files() {
        let tmp = tempdir().unwrap();
        let modules_dir = tmp.path().join("modules");
        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("api_ingress.yaml"),
            "bind_addr: \"127.0.0.1:9000\"\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 8000
modules_dir: "{}"
"#,
            tmp.path().join("home").to_string_lossy().replace('\\', "/"),
            modules_dir.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "127.0.0.1:9000");
        assert_eq!(config.modules.len(), 1);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_store_env_fallback_fills_only_missing_fields() {
        let mut store = StoreConfig {
            url: "https://explicit.supabase.co".into(),
            service_role_key: String::new(),
        };
        store.fill_from(|key| match key {
            STORE_URL_ENV => Some("https://env.supabase.co".into()),
            STORE_KEY_ENV => Some("env-key".into()),
            _ => None,
        });
        assert_eq!(store.url, "https://explicit.supabase.co");
        assert_eq!(store.service_role_key, "env-key");
    }

    #[test]
    fn test_store_validate_fails_fast_without_credentials() {
        let err = StoreConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("store credentials not found"));

        let bad_url = StoreConfig {
            url: "not a url".into(),
            service_role_key: "k".into(),
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_to_yaml_redacts_service_key() {
        let config = AppConfig {
            store: Some(StoreConfig {
                url: "https://demo.supabase.co".into(),
                service_role_key: "super-secret".into(),
            }),
            ..AppConfig::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("<redacted>"));
        assert!(!yaml.contains("super-secret"));
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose_level, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            let args = CliArgs {
                config: None,
                port: Some(3000),
                print_config: false,
                verbose: verbose_level,
                mock: false,
            };

            config.apply_cli_overrides(&args);

            assert_eq!(config.server.port, 3000);
            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected);
        }
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct DemoModuleConfig {
        #[serde(default)]
        table: String,
    }

    #[test]
    fn test_module_config_typed_lookup() {
        let mut config = AppConfig::default();
        let missing: DemoModuleConfig = config.module_config("demo").unwrap();
        assert_eq!(missing, DemoModuleConfig::default());

        config
            .modules
            .insert("demo".into(), serde_json::json!({"table": "user_data"}));
        let present: DemoModuleConfig = config.module_config("demo").unwrap();
        assert_eq!(present.table, "user_data");

        config
            .modules
            .insert("demo".into(), serde_json::json!({"table": 42}));
        assert!(config.module_config::<DemoModuleConfig>("demo").is_err());
    }

    #[test]
    fn test_invalid_yaml_missing_required_field() {
        let invalid_yaml = r#"
server:
  home_dir: "~/.test"
  port: 8000
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(invalid_yaml);
        assert!(result.is_err());
    }
}
