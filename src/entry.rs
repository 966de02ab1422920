use std::sync::Arc;

use crate::store::Md5Digest;

/// The live payload of an in-flight write.
///
/// Modeled as an owned, cheaply-cloned `Arc<[u8]>` rather than a borrow of the caller's buffer:
/// the reference implementation this is grounded on relies on the writing thread blocking for the
/// duration of the call, so a raw borrowed pointer is sound there, but sharing an arbitrary
/// lifetime across a `Mutex`-protected table and any number of concurrently-reading threads isn't
/// expressible in safe Rust. See DESIGN.md.
#[derive(Clone)]
pub(crate) enum WriteSource {
    Zero,
    Data(Arc<[u8]>),
}

impl WriteSource {
    pub(crate) fn copy_into(&self, dst: &mut [u8]) {
        match self {
            WriteSource::Zero => dst.fill(0),
            WriteSource::Data(data) => dst.copy_from_slice(data),
        }
    }
}

/// The tagged state of a single tracked block.
///
/// There is no explicit `Clean` variant: a CLEAN block is simply the absence of an `Entry` in the
/// table. The `Writing`/`Written` split statically encodes the invariant that state = WRITING iff
/// timestamp = 0 iff absent from the expiry queue: there is no `timestamp_ms` field to
/// desynchronize from the state, because it only exists inside the `Written` variant.
pub(crate) enum EntryPayload {
    Writing(WriteSource),
    Written { md5: Md5Digest, timestamp_ms: u64 },
}

pub(crate) struct Entry {
    pub(crate) payload: EntryPayload,
}

impl Entry {
    pub(crate) fn writing(src: WriteSource) -> Self {
        Self {
            payload: EntryPayload::Writing(src),
        }
    }

    pub(crate) fn is_writing(&self) -> bool {
        matches!(self.payload, EntryPayload::Writing(_))
    }

    pub(crate) fn written_timestamp_ms(&self) -> Option<u64> {
        match self.payload {
            EntryPayload::Written { timestamp_ms, .. } => Some(timestamp_ms),
            EntryPayload::Writing(_) => None,
        }
    }
}
