use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, error};
use redis::{Connection, RedisResult};

use crate::macros::redis::delete_keys;
use crate::modules::models::driver::Driver;
use crate::modules::redis::Redis;

/// What a driver is looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverKey {
    Id(i32),
    PsnId(String),
    TelegramId(String),
}

impl DriverKey {
    /// every key a driver can be cached under
    pub fn all_for(driver: &Driver) -> Vec<DriverKey> {
        let mut keys = vec![DriverKey::Id(driver.id), DriverKey::PsnId(driver.psn_id.clone())];
        if let Some(telegram_id) = &driver.telegram_id {
            keys.push(DriverKey::TelegramId(telegram_id.clone()));
        }
        keys
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKey::Id(id) => write!(f, "drivers/id/{}", id),
            DriverKey::PsnId(psn_id) => write!(f, "drivers/psn/{}", psn_id),
            DriverKey::TelegramId(telegram_id) => write!(f, "drivers/telegram/{}", telegram_id),
        }
    }
}

/// Short lived cache for driver lookups.
///
/// Entries may be stale for at most the cache's time to live, writers that change
/// a driver call `invalidate` so the next lookup goes back to the database.
pub trait DriverCache {
    fn get(&mut self, key: &DriverKey) -> Option<Driver>;
    fn insert(&mut self, key: &DriverKey, driver: &Driver);
    fn invalidate(&mut self, driver: &Driver);
}

/// In process cache bounded by age and entry count.
pub struct MemoryCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<DriverKey, (Instant, Driver)>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, capacity: usize) -> MemoryCache {
        MemoryCache {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (stored_at, _))| *stored_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl DriverCache for MemoryCache {
    fn get(&mut self, key: &DriverKey) -> Option<Driver> {
        let expired = match self.entries.get(key) {
            Some((stored_at, driver)) if stored_at.elapsed() < self.ttl => return Some(driver.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn insert(&mut self, key: &DriverKey, driver: &Driver) {
        self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(key.clone(), (Instant::now(), driver.clone()));
    }

    fn invalidate(&mut self, driver: &Driver) {
        self.entries.retain(|_, (_, cached)| cached.id != driver.id);
    }
}

/// Cache shared between processes through redis. Drivers are stored as json.
pub struct RedisCache {
    conn: Connection,
    ttl_secs: usize,
}

impl RedisCache {
    pub fn connect(redis_url: &str, ttl: Duration) -> RedisResult<RedisCache> {
        Ok(RedisCache {
            conn: Redis::connect(redis_url)?,
            ttl_secs: ttl.as_secs().max(1) as usize,
        })
    }
}

impl DriverCache for RedisCache {
    fn get(&mut self, key: &DriverKey) -> Option<Driver> {
        match Redis::get_data::<String, Option<String>>(&mut self.conn, key.to_string()) {
            Ok(Some(data)) => match serde_json::from_str::<Driver>(&data) {
                Ok(driver) => Some(driver),
                Err(error) => {
                    debug!(target:"cache/redis:get", "Discarding unreadable entry {}: {}", key, error);
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                error!(target:"cache/redis:get", "Error reading {} from redis: {}", key, error);
                None
            }
        }
    }

    fn insert(&mut self, key: &DriverKey, driver: &Driver) {
        let data = match serde_json::to_string(driver) {
            Ok(data) => data,
            Err(error) => {
                error!(target:"cache/redis:insert", "Error serializing driver {}: {}", driver.id, error);
                return;
            }
        };

        if let Err(error) = Redis::set_data_ex(&mut self.conn, key.to_string(), data, self.ttl_secs) {
            error!(target:"cache/redis:insert", "Error writing {} to redis: {}", key, error);
        }
    }

    fn invalidate(&mut self, driver: &Driver) {
        let keys: Vec<String> = DriverKey::all_for(driver).iter().map(|key| key.to_string()).collect();
        delete_keys!(&mut self.conn, keys, "cache/redis:invalidate");
    }
}
