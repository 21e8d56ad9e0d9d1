//! Exporter configuration.
//!
//! Every setting can be given as a command-line flag or an environment
//! variable. Flags win over environment variables, and empty environment
//! values count as unset. The PAT token is a `SecretString`, so it is
//! redacted in Debug output.

use clap::Parser;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default listen address (all interfaces, port 8080).
pub const DEFAULT_LISTEN_ADDRESS: &str = ":8080";

/// Default delay between two sweeps.
pub const DEFAULT_SLEEP_DURATION: Duration = Duration::from_secs(300);

/// Default Azure DevOps API root.
pub const DEFAULT_API_BASE_URL: &str = "https://dev.azure.com";

pub const PAT_TOKEN_VAR: &str = "PAT_TOKEN";
pub const LISTEN_ADDRESS_VAR: &str = "LISTEN_ADDRESS";
pub const SLEEP_DURATION_VAR: &str = "SLEEP_DURATION";
pub const BUILDS_VAR: &str = "BUILDS";
pub const API_BASE_URL_VAR: &str = "API_BASE_URL";

/// Command-line flags. Each one overrides the environment variable of the
/// same meaning.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "ado-exporter",
    version,
    about = "Exports Azure DevOps build definition metrics for Prometheus"
)]
pub struct Args {
    /// PAT token (env PAT_TOKEN)
    #[arg(long = "pat")]
    pub pat: Option<String>,

    /// Listen address, e.g. :8080 (env LISTEN_ADDRESS)
    #[arg(long = "listen-address")]
    pub listen_address: Option<String>,

    /// Duration to sleep between gathering metrics, e.g. 5m (env SLEEP_DURATION)
    #[arg(long = "sleep")]
    pub sleep: Option<String>,

    /// Build endpoints: org1/project1/definition1,org2/project2/definition2 (env BUILDS)
    #[arg(long = "builds")]
    pub builds: Option<String>,

    /// Azure DevOps API root (env API_BASE_URL)
    #[arg(long = "api-base-url")]
    pub api_base_url: Option<String>,
}

/// Resolved exporter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Personal access token sent as the basic-auth password.
    pub pat_token: SecretString,

    /// Listen address for the HTTP endpoint (default: ":8080").
    pub listen_address: String,

    /// Delay between the end of one sweep and the start of the next.
    pub poll_interval: Duration,

    /// Raw `org/project/definition` entries, in configured order.
    ///
    /// Entries are validated at the start of each sweep, not here.
    pub builds: Vec<String>,

    /// Azure DevOps API root (default: "https://dev.azure.com").
    pub api_base_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingSetting(String),

    #[error("Invalid sleep duration: {0}")]
    InvalidSleepDuration(String),

    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Invalid API base URL: {0}")]
    InvalidApiBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Illegal build target '{0}': expected org/project/definition")]
    MalformedTarget(String),
}

impl Config {
    /// Load configuration from flags and the process environment.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        Self::resolve(args, &env::vars().collect())
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::resolve(&Args::default(), vars)
    }

    /// Merge flags over environment values and validate the result.
    pub fn resolve(args: &Args, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let pat_token = pick(args.pat.as_ref(), vars, PAT_TOKEN_VAR)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingSetting(PAT_TOKEN_VAR.to_string()))?;

        let builds = pick(args.builds.as_ref(), vars, BUILDS_VAR)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingSetting(BUILDS_VAR.to_string()))?;

        let listen_address = pick(args.listen_address.as_ref(), vars, LISTEN_ADDRESS_VAR)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        validate_listen_address(&listen_address)?;

        let poll_interval = match pick(args.sleep.as_ref(), vars, SLEEP_DURATION_VAR) {
            Some(value) => {
                let parsed = parse_duration(&value).map_err(|e| {
                    ConfigError::InvalidSleepDuration(format!(
                        "{SLEEP_DURATION_VAR} must be a duration like 5m or 90s, got '{value}': {e}"
                    ))
                })?;
                if parsed.is_zero() {
                    return Err(ConfigError::InvalidSleepDuration(format!(
                        "{SLEEP_DURATION_VAR} must be greater than 0, got '{value}'"
                    )));
                }
                parsed
            }
            None => DEFAULT_SLEEP_DURATION,
        };

        let api_base_url = pick(args.api_base_url.as_ref(), vars, API_BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Config {
            pat_token: SecretString::from(pat_token),
            listen_address,
            poll_interval,
            builds: builds.split(',').map(str::to_string).collect(),
            api_base_url,
        })
    }

    /// Address handed to the TCP listener.
    ///
    /// A Go-style `:port` address binds every interface.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

/// A flag wins when present; otherwise a non-empty environment value.
fn pick(flag: Option<&String>, vars: &HashMap<String, String>, key: &str) -> Option<String> {
    flag.cloned()
        .or_else(|| vars.get(key).filter(|v| !v.is_empty()).cloned())
}

fn validate_listen_address(address: &str) -> Result<(), ConfigError> {
    let port = address
        .rsplit_once(':')
        .map(|(_, port)| port)
        .ok_or_else(|| {
            ConfigError::InvalidListenAddress(format!(
                "{LISTEN_ADDRESS_VAR} must be host:port or :port, got '{address}'"
            ))
        })?;

    port.parse::<u16>().map(|_| ()).map_err(|e| {
        ConfigError::InvalidListenAddress(format!(
            "{LISTEN_ADDRESS_VAR} has an invalid port '{port}': {e}"
        ))
    })
}

/// Parse a Go-style duration string such as `300ms`, `90s`, `5m` or `1h30m`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. Fractions are allowed
/// (`1.5h`). A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    if text == "0" {
        return Ok(Duration::ZERO);
    }

    let is_number_char = |c: char| c.is_ascii_digit() || c == '.';
    let mut total_nanos = 0f64;
    let mut rest = text;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number_char(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        if number.is_empty() {
            return Err(format!("expected a number at '{rest}'"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{number}'"))?;

        let unit_end = tail.find(is_number_char).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit after '{number}'")),
            other => return Err(format!("unknown unit '{other}'")),
        };

        total_nanos += value * nanos_per_unit;
        rest = next;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = total_nanos.round() as u64;
    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (PAT_TOKEN_VAR.to_string(), "secret-pat".to_string()),
            (BUILDS_VAR.to_string(), "org1/proj1/def1".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.pat_token.expose_secret(), "secret-pat");
        assert_eq!(config.listen_address, ":8080");
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.builds, vec!["org1/proj1/def1".to_string()]);
        assert_eq!(config.api_base_url, "https://dev.azure.com");
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert(LISTEN_ADDRESS_VAR.to_string(), "127.0.0.1:9100".to_string());
        vars.insert(SLEEP_DURATION_VAR.to_string(), "90s".to_string());
        vars.insert(
            BUILDS_VAR.to_string(),
            "org1/proj1/def1,org2/proj2/def2".to_string(),
        );
        vars.insert(
            API_BASE_URL_VAR.to_string(),
            "http://127.0.0.1:3000".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.listen_address, "127.0.0.1:9100");
        assert_eq!(config.poll_interval, Duration::from_secs(90));
        assert_eq!(
            config.builds,
            vec!["org1/proj1/def1".to_string(), "org2/proj2/def2".to_string()]
        );
        assert_eq!(config.api_base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_missing_pat_token() {
        let mut vars = base_vars();
        vars.remove(PAT_TOKEN_VAR);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingSetting(v)) if v == "PAT_TOKEN"));
    }

    #[test]
    fn test_empty_pat_token_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert(PAT_TOKEN_VAR.to_string(), String::new());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingSetting(v)) if v == "PAT_TOKEN"));
    }

    #[test]
    fn test_empty_builds_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert(BUILDS_VAR.to_string(), String::new());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingSetting(v)) if v == "BUILDS"));
    }

    #[test]
    fn test_malformed_builds_are_not_rejected_at_load() {
        let mut vars = base_vars();
        vars.insert(BUILDS_VAR.to_string(), "bad-target".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.builds, vec!["bad-target".to_string()]);
    }

    #[test]
    fn test_flags_override_env() {
        let args = Args {
            pat: Some("flag-pat".to_string()),
            listen_address: Some(":9000".to_string()),
            sleep: Some("1m".to_string()),
            builds: Some("a/b/c".to_string()),
            api_base_url: None,
        };

        let config = Config::resolve(&args, &base_vars()).expect("Config should load successfully");

        assert_eq!(config.pat_token.expose_secret(), "flag-pat");
        assert_eq!(config.listen_address, ":9000");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.builds, vec!["a/b/c".to_string()]);
    }

    #[test]
    fn test_empty_pat_flag_is_fatal_even_with_env() {
        let args = Args {
            pat: Some(String::new()),
            ..Args::default()
        };

        let result = Config::resolve(&args, &base_vars());
        assert!(matches!(result, Err(ConfigError::MissingSetting(v)) if v == "PAT_TOKEN"));
    }

    #[test]
    fn test_args_parse_flags() {
        let args = Args::try_parse_from([
            "ado-exporter",
            "--pat",
            "p",
            "--listen-address",
            ":8181",
            "--sleep",
            "10s",
            "--builds",
            "o/p/d",
        ])
        .expect("Flags should parse");

        assert_eq!(args.pat.as_deref(), Some("p"));
        assert_eq!(args.listen_address.as_deref(), Some(":8181"));
        assert_eq!(args.sleep.as_deref(), Some("10s"));
        assert_eq!(args.builds.as_deref(), Some("o/p/d"));
        assert!(args.api_base_url.is_none());
    }

    #[test]
    fn test_sleep_duration_rejects_zero() {
        let mut vars = base_vars();
        vars.insert(SLEEP_DURATION_VAR.to_string(), "0s".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSleepDuration(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_sleep_duration_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert(SLEEP_DURATION_VAR.to_string(), "five-minutes".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSleepDuration(msg)) if msg.contains("five-minutes"))
        );
    }

    #[test]
    fn test_listen_address_rejects_missing_port() {
        let mut vars = base_vars();
        vars.insert(LISTEN_ADDRESS_VAR.to_string(), "localhost".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidListenAddress(_))));
    }

    #[test]
    fn test_listen_address_rejects_bad_port() {
        let mut vars = base_vars();
        vars.insert(LISTEN_ADDRESS_VAR.to_string(), ":99999".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidListenAddress(msg)) if msg.contains("invalid port"))
        );
    }

    #[test]
    fn test_bind_address_expands_port_only_form() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");

        let mut vars = base_vars();
        vars.insert(LISTEN_ADDRESS_VAR.to_string(), "127.0.0.1:0".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:0");
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("10ns").unwrap(), Duration::from_nanos(10));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2m30s").unwrap(), Duration::from_secs(150));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("1..5s").is_err());
    }

    #[test]
    fn test_debug_redacts_pat_token() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret-pat"));
    }
}
