//! Lua scripts run server side so that a read and the write depending on it are one operation

/// Deletes the key only when it still holds the caller's value
pub const COMPARE_AND_DELETE: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Refreshes the key's TTL (milliseconds) only when it still holds the caller's value
pub const COMPARE_AND_EXPIRE: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;
