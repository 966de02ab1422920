use crate::entry::EntryPayload;
use crate::error::EcpError;
use crate::protect::{now_ms, EcProtect};
use crate::store::{BlockStore, Md5Digest};

impl<I> EcProtect<I>
where
    I: BlockStore,
{
    /// Implements the read path:
    ///
    /// 1. Run the expiry scavenger.
    /// 2. If an entry exists and is `Writing`, serve the live payload and return.
    /// 3. If an entry exists and is `Written`, the stored MD5 overrides whatever `expect_md5` the
    ///    caller supplied; a zero-MD5 entry is served without touching the backend at all.
    /// 4. Otherwise delegate straight to the inner store.
    pub(crate) fn read_block_impl(
        &self,
        block_num: u64,
        dst: &mut [u8],
        expect_md5: Option<Md5Digest>,
    ) -> Result<(), EcpError<I::Error>> {
        let mut guard = self.state.lock();
        guard.scavenge(now_ms(), self.config.cache_time(), &self.space_cond);

        #[cfg(any(test, feature = "invariant-checks"))]
        guard.check_invariants(self.config.cache_size());

        match guard.entries.get(&block_num) {
            Some(entry) => match &entry.payload {
                EntryPayload::Writing(src) => {
                    src.copy_into(dst);
                    guard.counters.cache_data_hits += 1;
                    drop(guard);
                    Ok(())
                }
                EntryPayload::Written { md5, .. } => {
                    let effective_md5 = *md5;
                    if let Some(caller_md5) = expect_md5 {
                        if caller_md5 != effective_md5 {
                            warn!(
                                block_num,
                                "Caller-supplied expected MD5 disagrees with the cached MD5 for \
                                 this block; proceeding with the cached value."
                            );
                        }
                    }

                    if effective_md5 == self.zero_md5 {
                        dst.fill(0);
                        guard.counters.cache_data_hits += 1;
                        drop(guard);
                        return Ok(());
                    }

                    drop(guard);
                    self.inner
                        .read_block(block_num, dst, Some(effective_md5))
                        .map_err(|source| EcpError::Inner { source })
                }
            },
            None => {
                drop(guard);
                self.inner
                    .read_block(block_num, dst, expect_md5)
                    .map_err(|source| EcpError::Inner { source })
            }
        }
    }
}
