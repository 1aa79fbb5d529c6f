use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "clinqna", about = "Web client for the CliniQ&A medical forum")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base URL of the forum backend (in-memory backend when unset)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Base URL of the identity provider
    #[arg(long)]
    pub identity_url: Option<String>,

    /// Accept any credential as its own principal (local development only)
    #[arg(long)]
    pub dev_identity: bool,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub identity: IdentityConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible origin, used to build the sign-in callback URL.
    pub public_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub url: Option<String>,
    /// Opt-in development sign-in, used only when `url` is unset.
    pub dev: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_url: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "clinqna_session".to_string(),
            session_hours: 24,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| Self::data_dir(cli).join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.backend_url {
            config.backend.url = Some(url.clone());
        }
        if let Some(ref url) = cli.identity_url {
            config.identity.url = Some(url.clone());
        }
        if cli.dev_identity {
            config.identity.dev = true;
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".clinqna")
        })
    }

    /// Origin the browser reaches this server at.
    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_hours * 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_dir(dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            backend_url: None,
            identity_url: None,
            dev_identity: false,
            data_dir: Some(dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "clinqna_session");
        assert_eq!(config.auth.session_hours, 24);
        assert!(config.backend.url.is_none());
        assert!(config.identity.url.is_none());
        assert!(!config.identity.dev);
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with_dir(PathBuf::from("/tmp/test-clinqna"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-clinqna"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_clinqna() {
        let cli = Cli {
            data_dir: None,
            ..cli_with_dir(PathBuf::new())
        };
        assert!(Config::data_dir(&cli).ends_with(".clinqna"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with_dir(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.public_url(), "http://127.0.0.1:3000");
        assert_eq!(config.session_ttl(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 8080
public_url = "https://clinqna.example"

[backend]
url = "http://127.0.0.1:4943"

[identity]
url = "http://identity.localhost:4943/"

[auth]
session_hours = 2
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_with_dir(tmp.path().to_path_buf())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.public_url(), "https://clinqna.example");
        assert_eq!(config.backend.url.as_deref(), Some("http://127.0.0.1:4943"));
        assert_eq!(
            config.identity.url.as_deref(),
            Some("http://identity.localhost:4943/")
        );
        assert_eq!(config.auth.session_hours, 2);
        assert_eq!(config.auth.cookie_name, "clinqna_session");
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[backend]
url = "http://from-file"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            backend_url: Some("http://from-cli".to_string()),
            identity_url: None,
            dev_identity: true,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.backend.url.as_deref(), Some("http://from-cli"));
        assert!(config.identity.dev);
    }
}
