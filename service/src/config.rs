use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RuntimeEnvParseError;

impl FromStr for RuntimeEnv {
    type Err = RuntimeEnvParseError;
    fn from_str(level: &str) -> Result<RuntimeEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RuntimeEnv::Development),
            "production" => Ok(RuntimeEnv::Production),
            "staging" => Ok(RuntimeEnv::Staging),
            _ => Err(RuntimeEnvParseError),
        }
    }
}

impl fmt::Display for RuntimeEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeEnv::Development => write!(f, "development"),
            RuntimeEnv::Production => write!(f, "production"),
            RuntimeEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The base URL of the backend REST API. The real-time events endpoint
    /// is derived from it, mirroring its scheme (https becomes wss).
    #[arg(short, long, env, default_value = "http://localhost:4000")]
    backend_base_url: String,

    /// Bearer token of an already-authenticated session. When absent, no
    /// events connection is attempted until one is provided at runtime.
    #[arg(long, env)]
    session_token: Option<String>,

    /// Seconds to wait before redialing a dropped events connection.
    #[arg(long, env, default_value_t = 3)]
    pub reconnect_delay_secs: u64,

    /// How many recent notifications the console retains for display.
    #[arg(long, env, default_value_t = 50)]
    pub notification_history_limit: usize,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RuntimeEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RuntimeEnv>().unwrap()),
    )]
    pub runtime_env: RuntimeEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn backend_base_url(&self) -> &str {
        &self.backend_base_url
    }

    /// Returns the configured session token, if any.
    pub fn session_token(&self) -> Option<String> {
        self.session_token.clone()
    }

    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn runtime_env(&self) -> RuntimeEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        // This could check an environment variable, or a config field
        self.runtime_env() == RuntimeEnv::Production
    }
}
