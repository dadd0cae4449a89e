//! Process exit codes of the `vacation` binary.

/// Run finished; audit clean, barrier clear, teardown done.
pub const OK: u8 = 0;

/// Run finished but a post-run check failed.
pub const CHECK_FAILED: u8 = 1;

/// Configuration could not be loaded or is out of range.
pub const INVALID_CONFIG: u8 = 2;
