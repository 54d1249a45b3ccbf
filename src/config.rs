use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::strategy::engine::LoopTiming;
use crate::types::StrategyConfig;
use crate::utils::key_util::{load_signing_key, Credentials, RequestSigner};

pub const API_KEY: &str = "BINANCE_API_KEY";
pub const API_SECRET: &str = "BINANCE_API_SECRET";
pub const PRIVATE_KEY: &str = "BINANCE_PRIVATE_KEY_BASE64";

const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";
const ENV_FILES: [&str; 2] = [".env", "r.env"];

/// Loads the first env file that exists. A file that fails to parse is an error,
/// since dotenvy has already applied the lines before the bad one.
pub fn load_env_files() -> Result<Option<PathBuf>, ConfigError> {
    let candidates: Vec<&Path> = ENV_FILES.iter().map(|name| Path::new(*name)).collect();
    load_first_env_file(&candidates)
}

fn load_first_env_file(candidates: &[&Path]) -> Result<Option<PathBuf>, ConfigError> {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(Some(path.to_path_buf()));
    }
    Ok(None)
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub strategy: StrategyConfig,
    pub base_url: Url,
    pub timing: LoopTiming,
    pub request_timeout: Duration,
    pub recv_window_ms: u64,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbol = lookup("BOT_SYMBOL")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| "ETHUSDT".to_string());
        if symbol.is_empty() {
            return Err(invalid("BOT_SYMBOL", &symbol, "must not be empty"));
        }

        let base_investment: f64 = read(&lookup, "BOT_BASE_INVESTMENT", 5.0)?;
        require_positive("BOT_BASE_INVESTMENT", base_investment)?;

        let step_size: f64 = read(&lookup, "BOT_STEP_SIZE", 1.0)?;
        require_positive("BOT_STEP_SIZE", step_size)?;

        let progression_factor: f64 = read(&lookup, "BOT_PROGRESSION_FACTOR", 1.1)?;
        if !progression_factor.is_finite() || progression_factor <= 1.0 {
            return Err(invalid(
                "BOT_PROGRESSION_FACTOR",
                &progression_factor.to_string(),
                "must be greater than 1.0",
            ));
        }

        let leverage: u32 = read(&lookup, "BOT_LEVERAGE", 11)?;
        if leverage == 0 {
            return Err(invalid("BOT_LEVERAGE", "0", "must be positive"));
        }

        let max_steps: Option<u32> = read_optional(&lookup, "BOT_MAX_STEPS")?;
        if max_steps == Some(0) {
            return Err(invalid("BOT_MAX_STEPS", "0", "must be positive"));
        }

        let max_investment: Option<f64> = read_optional(&lookup, "BOT_MAX_INVESTMENT")?;
        if let Some(cap) = max_investment {
            if !cap.is_finite() || cap < base_investment {
                return Err(invalid(
                    "BOT_MAX_INVESTMENT",
                    &cap.to_string(),
                    "must not be below BOT_BASE_INVESTMENT",
                ));
            }
        }

        let poll_interval = read_millis(&lookup, "BOT_POLL_INTERVAL_MS", 1_000)?;
        let error_backoff = read_millis(&lookup, "BOT_ERROR_BACKOFF_MS", 5_000)?;
        let request_timeout = read_millis(&lookup, "BOT_REQUEST_TIMEOUT_MS", 10_000)?;

        let recv_window_ms: u64 = read(&lookup, "BOT_RECV_WINDOW_MS", 5_000)?;
        if !(1..=60_000).contains(&recv_window_ms) {
            return Err(invalid(
                "BOT_RECV_WINDOW_MS",
                &recv_window_ms.to_string(),
                "must be between 1 and 60000",
            ));
        }

        let raw_url = lookup("BINANCE_FAPI_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(raw_url.trim())
            .map_err(|e| invalid("BINANCE_FAPI_URL", &raw_url, &e.to_string()))?;

        Ok(BotConfig {
            strategy: StrategyConfig {
                symbol,
                base_investment,
                progression_factor,
                step_size,
                leverage,
                max_steps,
                max_investment,
            },
            base_url,
            timing: LoopTiming {
                poll_interval,
                error_backoff,
            },
            request_timeout,
            recv_window_ms,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn read<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(read_optional(lookup, key)?.unwrap_or(default))
}

fn read_optional<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, &raw, &e.to_string())),
        _ => Ok(None),
    }
}

fn read_millis<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: u64 = read(lookup, key, default)?;
    if ms == 0 {
        return Err(invalid(key, "0", "must be positive"));
    }
    Ok(Duration::from_millis(ms))
}

fn require_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, &value.to_string(), "must be positive"))
    }
}

/// Somewhere API credentials can come from.
pub trait CredentialSource {
    fn get(&self, key: &'static str) -> Result<Option<String>, ConfigError>;
}

pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        Ok(env::var(key).ok())
    }
}

/// Asks for the key and secret on an interactive terminal.
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn available() -> bool {
        io::stdin().is_terminal()
    }
}

impl CredentialSource for TerminalPrompt {
    fn get(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        let label = match key {
            API_KEY => "Enter your Binance API KEY: ",
            API_SECRET => "Enter your Binance API SECRET: ",
            _ => return Ok(None),
        };
        let mut stdout = io::stdout();
        stdout.write_all(label.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(Some(line.trim().to_string()))
    }
}

fn first_non_empty(
    sources: &[&dyn CredentialSource],
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    for source in sources {
        if let Some(value) = source.get(key)? {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}

/// Resolves the API key and a signer. An Ed25519 private key wins over an HMAC secret.
pub fn load_credentials(sources: &[&dyn CredentialSource]) -> Result<Credentials, ConfigError> {
    let api_key = first_non_empty(sources, API_KEY)?.ok_or(ConfigError::Missing(API_KEY))?;

    let signer = match first_non_empty(sources, PRIVATE_KEY)? {
        Some(key_b64) => {
            RequestSigner::Ed25519(load_signing_key(&key_b64).map_err(ConfigError::SigningKey)?)
        }
        None => {
            let secret =
                first_non_empty(sources, API_SECRET)?.ok_or(ConfigError::Missing(API_SECRET))?;
            RequestSigner::Hmac(secret)
        }
    };

    Ok(Credentials { api_key, signer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    struct MapSource(HashMap<&'static str, &'static str>);

    impl CredentialSource for MapSource {
        fn get(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
            Ok(self.0.get(key).map(|v| v.to_string()))
        }
    }

    fn write_env_file(contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("ladder-{}.env", uuid::Uuid::new_v4().simple()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn malformed_env_file_is_an_error() {
        let path = write_env_file("LADDER_ENV_OK=1\nLADDER_ENV_BAD \"x\nLADDER_ENV_AFTER=3\n");

        let err = load_first_env_file(&[path.as_path()]).unwrap_err();

        assert!(matches!(err, ConfigError::EnvFile { path: ref p, .. } if *p == path));
        assert_eq!(env::var("LADDER_ENV_AFTER").ok(), None);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn first_existing_env_file_wins() {
        let missing = env::temp_dir().join("ladder-does-not-exist.env");
        let present = write_env_file("LADDER_ENV_LOADED=yes\n");

        let loaded = load_first_env_file(&[missing.as_path(), present.as_path()]).unwrap();

        assert_eq!(loaded, Some(present.clone()));
        assert_eq!(env::var("LADDER_ENV_LOADED").ok().as_deref(), Some("yes"));
        std::fs::remove_file(&present).unwrap();
    }

    #[test]
    fn no_env_file_is_not_an_error() {
        let missing = env::temp_dir().join("ladder-also-missing.env");
        assert_eq!(load_first_env_file(&[missing.as_path()]).unwrap(), None);
    }

    #[test]
    fn defaults_match_the_eth_ladder() {
        let config = BotConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.strategy.symbol, "ETHUSDT");
        assert_eq!(config.strategy.base_investment, 5.0);
        assert_eq!(config.strategy.progression_factor, 1.1);
        assert_eq!(config.strategy.step_size, 1.0);
        assert_eq!(config.strategy.leverage, 11);
        assert_eq!(config.strategy.max_steps, None);
        assert_eq!(config.strategy.max_investment, None);
        assert_eq!(config.timing.poll_interval, Duration::from_secs(1));
        assert_eq!(config.timing.error_backoff, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.base_url.as_str(), "https://fapi.binance.com/");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("BOT_SYMBOL", " btcusdt "),
            ("BOT_BASE_INVESTMENT", "20"),
            ("BOT_MAX_STEPS", "8"),
            ("BOT_MAX_INVESTMENT", "100"),
            ("BOT_POLL_INTERVAL_MS", "250"),
            ("BINANCE_FAPI_URL", "https://testnet.binancefuture.com"),
        ]))
        .unwrap();

        assert_eq!(config.strategy.symbol, "BTCUSDT");
        assert_eq!(config.strategy.base_investment, 20.0);
        assert_eq!(config.strategy.max_steps, Some(8));
        assert_eq!(config.strategy.max_investment, Some(100.0));
        assert_eq!(config.timing.poll_interval, Duration::from_millis(250));
        assert_eq!(config.base_url.host_str(), Some("testnet.binancefuture.com"));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for (key, value) in [
            ("BOT_BASE_INVESTMENT", "0"),
            ("BOT_BASE_INVESTMENT", "-5"),
            ("BOT_STEP_SIZE", "0"),
            ("BOT_PROGRESSION_FACTOR", "1.0"),
            ("BOT_PROGRESSION_FACTOR", "0.9"),
            ("BOT_LEVERAGE", "0"),
            ("BOT_POLL_INTERVAL_MS", "0"),
            ("BOT_MAX_STEPS", "0"),
            ("BOT_MAX_INVESTMENT", "1"),
        ] {
            let err = BotConfig::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{}={} gave {:?}",
                key,
                value,
                err
            );
        }
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = BotConfig::from_lookup(lookup_from(&[("BOT_STEP_SIZE", "one")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BOT_STEP_SIZE", .. }));
    }

    #[test]
    fn hmac_credentials_from_secret() {
        let source = MapSource(HashMap::from([(API_KEY, "key"), (API_SECRET, "secret")]));
        let creds = load_credentials(&[&source]).unwrap();

        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.signer.kind(), "HMAC-SHA256");
    }

    #[test]
    fn ed25519_key_takes_precedence() {
        // base64 of 32 zero bytes
        let source = MapSource(HashMap::from([
            (API_KEY, "key"),
            (API_SECRET, "secret"),
            (PRIVATE_KEY, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
        ]));
        let creds = load_credentials(&[&source]).unwrap();

        assert_eq!(creds.signer.kind(), "Ed25519");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let source = MapSource(HashMap::from([(API_KEY, "  "), (API_SECRET, "secret")]));
        let err = load_credentials(&[&source]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_KEY)));

        let source = MapSource(HashMap::from([(API_KEY, "key")]));
        let err = load_credentials(&[&source]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_SECRET)));
    }

    #[test]
    fn later_sources_fill_gaps() {
        let env_like = MapSource(HashMap::from([(API_KEY, "key")]));
        let fallback = MapSource(HashMap::from([(API_SECRET, "typed-secret")]));
        let creds = load_credentials(&[&env_like, &fallback]).unwrap();

        assert!(matches!(creds.signer, RequestSigner::Hmac(ref s) if s == "typed-secret"));
    }

    #[test]
    fn bad_private_key_is_a_config_error() {
        let source = MapSource(HashMap::from([(API_KEY, "key"), (PRIVATE_KEY, "not base64!")]));
        let err = load_credentials(&[&source]).unwrap_err();
        assert!(matches!(err, ConfigError::SigningKey(_)));
    }
}
