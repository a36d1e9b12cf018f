use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use log::{error, LevelFilter};

use crate::errors::{CustomResult, Error};
use crate::modules::cache::{DriverCache, MemoryCache, RedisCache};
use crate::modules::helpers::matcher::{RosterEntry, DEFAULT_CUTOFF};
use crate::modules::result_builder::ResultBuilder;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_CACHE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub logging_level: LevelFilter,
    pub log_file: String,
    pub driver_cache_ttl: Duration,
    pub driver_cache_size: usize,
    pub fuzzy_cutoff: f64,
}

impl Config {
    /// # load the configuration
    /// read the `.env` file (if any) and build the configuration from the environment
    ///
    /// ## Returns
    /// * `Config` - the configuration, or an error naming the missing or invalid key
    pub fn from_env() -> CustomResult<Config> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// # build the configuration from a lookup function
    /// only `DATABASE_URL` is required, every other key has a default
    ///
    /// ## Arguments
    /// * `lookup` - returns the raw value of a key, or None when it is not set
    pub fn from_lookup<F>(lookup: F) -> CustomResult<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| Error::MissingConfigError {
            key: "DATABASE_URL".to_string(),
        })?;

        let logging_level = match lookup("LOGGING_LEVEL").as_deref() {
            Some("OFF") => LevelFilter::Off,
            Some("ERROR") => LevelFilter::Error,
            Some("WARN") => LevelFilter::Warn,
            Some("DEBUG") => LevelFilter::Debug,
            Some("TRACE") => LevelFilter::Trace,
            // default to info
            _ => LevelFilter::Info,
        };

        let ttl_secs = parse_or(&lookup, "DRIVER_CACHE_TTL", DEFAULT_CACHE_TTL_SECS)?;
        let driver_cache_size = parse_or(&lookup, "DRIVER_CACHE_SIZE", DEFAULT_CACHE_SIZE)?;
        let fuzzy_cutoff = parse_or(&lookup, "FUZZY_CUTOFF", DEFAULT_CUTOFF)?;

        if !(0.0..=1.0).contains(&fuzzy_cutoff) {
            return Err(Error::InvalidConfigError {
                key: "FUZZY_CUTOFF".to_string(),
                value: fuzzy_cutoff.to_string(),
            });
        }

        Ok(Config {
            database_url,
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            logging_level,
            log_file: lookup("LOG_FILE").unwrap_or_else(|| "league.log".to_string()),
            driver_cache_ttl: Duration::from_secs(ttl_secs),
            driver_cache_size,
            fuzzy_cutoff,
        })
    }

    /// # build the driver cache
    /// redis backed when `REDIS_URL` is set and reachable, in process otherwise
    pub fn driver_cache(&self) -> Box<dyn DriverCache> {
        if let Some(url) = &self.redis_url {
            match RedisCache::connect(url, self.driver_cache_ttl) {
                Ok(cache) => return Box::new(cache),
                Err(err) => {
                    error!(target:"config:driver_cache", "Error connecting to redis, falling back to memory cache: {}", err);
                }
            }
        }

        Box::new(MemoryCache::new(self.driver_cache_ttl, self.driver_cache_size))
    }

    /// result builder for a session roster, matching names with `FUZZY_CUTOFF`
    pub fn result_builder<'a>(&self, roster: &'a [RosterEntry], class_order: Vec<i32>) -> ResultBuilder<'a> {
        ResultBuilder::new(roster, class_order).with_cutoff(self.fuzzy_cutoff)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> CustomResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| Error::InvalidConfigError {
            key: key.to_string(),
            value,
        }),
    }
}
