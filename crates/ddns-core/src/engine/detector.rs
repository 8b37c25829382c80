//! Change detection
//!
//! Decides whether a freshly resolved address has to be pushed.

/// Whether `resolved` must be pushed given the track's last-known address.
///
/// A missing last-known value always needs an update (cold cache). Otherwise
/// the comparison is byte-for-byte, with no normalization: `"2001:db8::1"`
/// and `"2001:DB8::1"` are different addresses here.
pub fn needs_update(last_known: Option<&str>, resolved: &str) -> bool {
    last_known != Some(resolved)
}
