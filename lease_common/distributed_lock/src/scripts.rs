//! Lua scripts for lease operations that need more than one Redis command

/// Lua script for seizing a lease only if it still holds the expected value.
/// Replaces the value and returns 1 when the current value equals ARGV[1], otherwise returns 0
pub const COMPARE_AND_SWAP: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        redis.call('set', KEYS[1], ARGV[2])
        return 1
    end
    return 0
"#;
