use std::time::Duration;

/// Snapshot of [`crate::EcProtect`]'s internal counters, as returned by
/// [`crate::EcProtect::get_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EcProtectStats {
    /// Number of entries currently tracked.
    pub current_cache_size: usize,
    /// Number of reads served directly from an entry, without a backend round trip.
    pub cache_data_hits: u64,
    /// Cumulative time spent waiting for table space to free up.
    pub cache_full_delay: Duration,
    /// Cumulative time spent waiting out `min_write_delay` on a block with a pending or recent
    /// write.
    pub repeated_write_delay: Duration,
    /// Number of allocation failures encountered while admitting a new entry.
    pub out_of_memory_errors: u64,
}

/// The mutable counters backing [`EcProtectStats`], held inside the same lock as the entry
/// table so a snapshot is always internally consistent.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) cache_data_hits: u64,
    pub(crate) cache_full_delay: Duration,
    pub(crate) repeated_write_delay: Duration,
    pub(crate) out_of_memory_errors: u64,
}
