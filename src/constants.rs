// -
// Trace file selection

/// File extension of Oracle session trace files
pub(crate) const TRACE_FILE_EXT: &str = "trc";
/// Basename infix between the database name and the server process id
pub(crate) const TRACE_FILE_INFIX: &str = "_ora_";

// -
// Miner wake channels

/// Capacity of a Miner wake channel. A single slot is enough: the Miner
/// drains to EOF after any wake, so extra wakes coalesce in the buffer.
pub(crate) const WAKE_CHANNEL_CAPACITY: usize = 1;

// -
// Varz sink file naming

pub(crate) const VARZ_FILE_PREFIX: &str = "oratail";
pub(crate) const VARZ_FILE_EXTENSION: &str = ".varz";
