use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "MENTORMATCH_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "MENTORMATCH_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "MENTORMATCH_DB_HOSTNAME";
const DB_PORT_VAR: &str = "MENTORMATCH_DB_PORT";
const DB_NAME_VAR: &str = "MENTORMATCH_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "MENTORMATCH_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "MENTORMATCH_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "MENTORMATCH_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "MENTORMATCH_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "MENTORMATCH_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "MENTORMATCH_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "MENTORMATCH_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "MENTORMATCH_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "MENTORMATCH_HASH_SALT_LENGTH";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "MENTORMATCH_ACCESS_TOKEN_LIFETIME_MINS";

const ACTIX_WORKER_COUNT_VAR: &str = "MENTORMATCH_ACTIX_WORKER_COUNT";

const LOG_LEVEL_VAR: &str = "MENTORMATCH_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,

    #[zeroize(skip)]
    pub log_level: String,
}

impl ConfigInner {
    pub fn database_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let hashing_key = Zeroizing::new(
            b64.decode(env_var::<String>(HASHING_KEY_VAR)?.as_bytes())
                .map_err(|_| ConfigError::InvalidVar(HASHING_KEY_VAR))?,
        );
        let hashing_key =
            key_bytes(&hashing_key).ok_or(ConfigError::InvalidVar(HASHING_KEY_VAR))?;

        let token_signing_key = Zeroizing::new(
            b64.decode(env_var::<String>(TOKEN_SIGNING_KEY_VAR)?.as_bytes())
                .map_err(|_| ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?,
        );
        let token_signing_key =
            key_bytes(&token_signing_key).ok_or(ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?;

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 3),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 62500),
            hash_threads: env_var_or(HASH_THREADS_VAR, 2),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 60) * 60,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

/// Takes the first N bytes of a decoded key. Returns None rather than
/// panicking when the key is too short, so the error message names the
/// offending variable instead of an index.
fn key_bytes<const N: usize>(decoded: &[u8]) -> Option<[u8; N]> {
    decoded.get(..N)?.try_into().ok()
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::MissingVar(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::InvalidVar(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bytes() {
        assert!(key_bytes::<32>(&[7u8; 31]).is_none());
        assert!(key_bytes::<32>(&[]).is_none());

        let exact = key_bytes::<32>(&[7u8; 32]).unwrap();
        assert_eq!(exact, [7u8; 32]);

        // Longer keys are truncated to the expected size
        let truncated = key_bytes::<32>(&[7u8; 40]).unwrap();
        assert_eq!(truncated, [7u8; 32]);
    }
}
