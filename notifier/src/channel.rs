//! Channel name handling.

/// Prefix users commonly write in front of channel names.
pub const CHANNEL_MARKER: char = '#';

/// Returns the canonical channel name: any leading `#` markers removed.
pub fn normalize_channel_name(name: &str) -> &str {
    name.trim_start_matches(CHANNEL_MARKER)
}
