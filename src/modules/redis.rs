use redis::{Client, Commands, Connection, FromRedisValue, RedisResult, ToRedisArgs};

pub struct Redis {}

impl Redis {
    pub fn connect(redis_url: &str) -> RedisResult<Connection> {
        Client::open(redis_url)?.get_connection()
    }

    /// store a value that expires after `ttl_secs`
    pub fn set_data_ex<K: ToRedisArgs, D: ToRedisArgs>(
        conn: &mut Connection,
        key: K,
        data: D,
        ttl_secs: usize,
    ) -> RedisResult<()> {
        conn.set_ex::<K, D, ()>(key, data, ttl_secs)
    }

    pub fn get_data<K: ToRedisArgs, D: FromRedisValue>(conn: &mut Connection, key: K) -> RedisResult<D> {
        conn.get::<K, D>(key)
    }

    pub fn delete<K: ToRedisArgs>(conn: &mut Connection, key: K) -> RedisResult<()> {
        conn.del::<K, ()>(key)
    }
}
