use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Command-line flags. Only flags actually given are serialized, so the
/// CLI layer never masks values from the TOML file or the environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "presence-server", version, about = "Real-time presence and message delivery server")]
pub struct Cli {
    /// Port to listen on (default: 1986)
    #[arg(long, env = "PRESENCE_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address (default: 0.0.0.0)
    #[arg(long, env = "PRESENCE_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./presence.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, signing key) (default: ./data)
    #[arg(long, env = "PRESENCE_DATA_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Print a signed access token for the given user id and exit
    #[arg(long, value_name = "USER_ID")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_token: Option<String>,

    /// Role claim for --issue-token (default: user)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_role: Option<String>,

    /// Lifetime of tokens printed by --issue-token, in seconds (default: 86400)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_ttl_secs: Option<i64>,
}

/// Effective server configuration after all layers are merged.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub generate_config: bool,
    pub data_dir: String,
    pub issue_token: Option<String>,
    pub token_role: String,
    pub token_ttl_secs: i64,
    /// WebSocket keepalive settings (`[keepalive]` section in TOML)
    pub keepalive: KeepaliveConfig,
}

/// Server-side ping/pong keepalive for WebSocket connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Seconds between server pings (default: 30)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before closing (default: 10)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            pong_timeout_secs: default_pong_timeout(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_pong_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1986,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            issue_token: None,
            token_role: "user".to_string(),
            token_ttl_secs: 86400,
            keepalive: KeepaliveConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (PRESENCE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(Cli::parse()).extract()
    }

    fn figment(cli: Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("PRESENCE_").split("__"))
            .merge(Serialized::defaults(cli))
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Presence Server Configuration
# Place this file at ./presence.toml or specify with --config <path>
# All settings can be overridden via environment variables (PRESENCE_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 1986)
# port = 1986

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite message store and JWT signing key
# data_dir = "./data"

# ---- WebSocket keepalive ----
# [keepalive]
# ping_interval_secs = 30   # server ping cadence
# pong_timeout_secs = 10    # close the connection if no pong within this window
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_flags() -> Cli {
        Cli::parse_from(["presence-server"])
    }

    #[test]
    fn test_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config: Config = Config::figment(no_flags()).extract()?;
            assert_eq!(config.port, 1986);
            assert!(!config.json_logs);
            assert_eq!(config.data_dir, "./data");
            assert_eq!(config.keepalive.ping_interval_secs, 30);
            assert_eq!(config.keepalive.pong_timeout_secs, 10);
            assert!(config.issue_token.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "presence.toml",
                r#"
                    port = 4000
                    json_logs = true
                    data_dir = "/var/lib/presence"
                    [keepalive]
                    pong_timeout_secs = 3
                "#,
            )?;
            let config: Config = Config::figment(no_flags()).extract()?;
            assert_eq!(config.port, 4000);
            assert!(config.json_logs);
            assert_eq!(config.data_dir, "/var/lib/presence");
            assert_eq!(config.keepalive.pong_timeout_secs, 3);
            assert_eq!(config.keepalive.ping_interval_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("presence.toml", "port = 4000\ntoken_role = \"moderator\"")?;
            jail.set_env("PRESENCE_TOKEN_ROLE", "admin");
            jail.set_env("PRESENCE_KEEPALIVE__PING_INTERVAL_SECS", "5");
            let config: Config = Config::figment(no_flags()).extract()?;
            assert_eq!(config.port, 4000);
            assert_eq!(config.token_role, "admin");
            assert_eq!(config.keepalive.ping_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn test_cli_flags_override_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "port = 4000\ntoken_ttl_secs = 60")?;
            let cli = Cli::parse_from([
                "presence-server",
                "--config",
                "custom.toml",
                "--port",
                "5000",
                "--issue-token",
                "alice",
            ]);
            let config: Config = Config::figment(cli).extract()?;
            assert_eq!(config.port, 5000);
            assert_eq!(config.token_ttl_secs, 60);
            assert_eq!(config.issue_token.as_deref(), Some("alice"));
            Ok(())
        });
    }

    #[test]
    fn test_template_mentions_every_section() {
        let template = generate_config_template();
        assert!(template.contains("[keepalive]"));
        assert!(template.contains("data_dir"));
    }
}
