//! Lua scripts for atomic cache operations.
//!
//! Redis runs each script atomically, so no client can observe (or crash
//! between) the intermediate states.

/// Increment a counter and (re)set its expiry in one step.
///
/// Arguments:
/// - KEYS[1]: Counter key
/// - ARGV[1]: Expiry in milliseconds
///
/// Returns:
/// - The counter value after the increment
pub const INCREMENT_WITH_EXPIRY: &str = r#"
local count = redis.call('INCR', KEYS[1])
redis.call('PEXPIRE', KEYS[1], ARGV[1])
return count
"#;
