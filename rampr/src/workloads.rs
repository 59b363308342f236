pub(crate) mod auth;
pub(crate) mod crud;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide unique suffix for generated test data, so concurrent
/// VUs never collide on emails or titles.
pub(crate) fn unique_nonce() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    millis
        .wrapping_mul(1_000)
        .wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed) % 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_distinct() {
        let a = unique_nonce();
        let b = unique_nonce();
        assert_ne!(a, b);
    }
}
