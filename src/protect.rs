use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::error::EcpError;
use crate::ledger::LedgerState;
use crate::stats::EcProtectStats;
use crate::store::{md5_of, BlockStore, BlockStoreSizes, Md5Digest, WriteInput};

/// The eventual-consistency protection layer.
///
/// Wraps an inner [`BlockStore`] and is itself a [`BlockStore`], so block-store layers (this one,
/// a data-block cache, and so on) can be composed by nesting.
pub struct EcProtect<I>
where
    I: BlockStore,
{
    pub(crate) inner: I,
    pub(crate) config: Config,
    pub(crate) state: Mutex<LedgerState>,
    /// Notified when an entry is removed (scavenger or a failed write), unblocking writers
    /// waiting for table space.
    pub(crate) space_cond: Condvar,
    /// Never notified. Exists solely as the target of pure timed waits (the WRITING-wait, the
    /// WRITTEN-too-soon wait, and the capacity-wait taken when every tracked block is currently
    /// `Writing` and so has no expiry deadline to bound the wait on `space_cond` instead), so
    /// those waits go through the same `wait_for` + re-check loop as everything else instead of a
    /// bare `thread::sleep` that can't be interrupted by `destroy`-adjacent bookkeeping. It's
    /// intentional, not a bug -- see DESIGN.md for the tradeoff this is making.
    pub(crate) never_cond: Condvar,
    /// Process-instance-wide zero block, allocated eagerly at construction since `block_size` is
    /// already fixed by then -- there is no lazy "first use" moment for a race to hide in.
    pub(crate) zero_block: Arc<[u8]>,
    pub(crate) zero_md5: Md5Digest,
}

impl<I> EcProtect<I>
where
    I: BlockStore,
{
    /// Creates a new protection layer wrapping `inner`, configured by `config`.
    pub fn new(inner: I, config: Config) -> Self {
        let zero_block: Arc<[u8]> = vec![0u8; config.block_size()].into();
        let zero_md5 = md5_of(&zero_block);

        Self {
            inner,
            config,
            state: Mutex::new(LedgerState::new()),
            space_cond: Condvar::new(),
            never_cond: Condvar::new(),
            zero_block,
            zero_md5,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshots the current counters, adding `current_cache_size`.
    pub fn get_stats(&self) -> EcProtectStats {
        let guard = self.state.lock();
        EcProtectStats {
            current_cache_size: guard.entries.len(),
            cache_data_hits: guard.counters.cache_data_hits,
            cache_full_delay: guard.counters.cache_full_delay,
            repeated_write_delay: guard.counters.repeated_write_delay,
            out_of_memory_errors: guard.counters.out_of_memory_errors,
        }
    }

    pub(crate) fn is_zero(&self, data: &[u8]) -> bool {
        data == &self.zero_block[..]
    }
}

impl<I> BlockStore for EcProtect<I>
where
    I: BlockStore,
{
    type Error = EcpError<I::Error>;

    fn read_block(
        &self,
        block_num: u64,
        dst: &mut [u8],
        expect_md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        self.read_block_impl(block_num, dst, expect_md5)
    }

    fn write_block(
        &self,
        block_num: u64,
        src: Option<&[u8]>,
        md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        let input = match src {
            Some(data) => WriteInput::Data(data),
            None => WriteInput::Zero,
        };
        self.write_block_impl(block_num, input, md5)
    }

    fn detect_sizes(&self) -> Result<BlockStoreSizes, Self::Error> {
        self.inner.detect_sizes().map_err(|source| EcpError::Inner { source })
    }

    fn destroy(&self) -> Result<(), Self::Error> {
        {
            let mut guard = self.state.lock();
            guard.entries.clear();
            guard.expiry_queue.clear();
        }
        self.inner.destroy().map_err(|source| EcpError::Inner { source })
    }
}

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
///
/// Monotonicity is assumed but not enforced: a backward clock jump degrades gracefully (expiries
/// or write-delay waits may fire early or late) since none of the invariants depend on real-time
/// ordering, only on table/queue structure.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
