//! Process-wide debug flags, readable and toggleable from anywhere in the
//! crate without threading a config object through every call site.

use std::sync::atomic::{AtomicU32, Ordering};

/// Logs every scene importer fetch and merge step.
pub const LOG_IMPORTER: u32 = 1 << 0;
/// Logs tile cache insert/evict decisions.
pub const LOG_TILE_CACHE: u32 = 1 << 1;
/// Logs tile manager per-frame visible-set computation.
pub const LOG_TILE_MANAGER: u32 = 1 << 2;
/// Disables the tile manager's prefetch ring, for deterministic tests.
pub const DISABLE_PREFETCH: u32 = 1 << 3;

static FLAGS: AtomicU32 = AtomicU32::new(0);

/// Returns true if `flag` is currently set.
pub fn is_set(flag: u32) -> bool {
    FLAGS.load(Ordering::Relaxed) & flag != 0
}

/// Sets `flag`.
pub fn set(flag: u32) {
    FLAGS.fetch_or(flag, Ordering::Relaxed);
}

/// Clears `flag`.
pub fn clear(flag: u32) {
    FLAGS.fetch_and(!flag, Ordering::Relaxed);
}

/// Flips `flag`, returning its new state.
pub fn toggle(flag: u32) -> bool {
    let previous = FLAGS.fetch_xor(flag, Ordering::Relaxed);
    previous & flag == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_reports_new_state() {
        clear(LOG_IMPORTER);
        assert!(!is_set(LOG_IMPORTER));
        assert!(toggle(LOG_IMPORTER));
        assert!(is_set(LOG_IMPORTER));
        assert!(!toggle(LOG_IMPORTER));
        assert!(!is_set(LOG_IMPORTER));
    }
}
