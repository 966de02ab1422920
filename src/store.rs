use std::fmt;

use md5::{Digest, Md5};

/// A 16-byte MD5 digest.
pub type Md5Digest = [u8; 16];

/// Computes the MD5 digest of `data`.
pub fn md5_of(data: &[u8]) -> Md5Digest {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The payload half of a write: either real bytes, or the explicit "all zeros" sentinel.
///
/// Distinguishing the zero case explicitly (rather than always passing a slice of zero bytes)
/// lets the inner store perform zero elision -- deleting the backing object instead of storing
/// `block_size` zero bytes -- which is the transport-layer optimization this crate cooperates
/// with but does not itself implement.
#[derive(Clone, Copy)]
pub enum WriteInput<'a> {
    Zero,
    Data(&'a [u8]),
}

impl<'a> WriteInput<'a> {
    pub fn len(&self, block_size: usize) -> usize {
        match self {
            WriteInput::Zero => block_size,
            WriteInput::Data(d) => d.len(),
        }
    }
}

impl fmt::Debug for WriteInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteInput::Zero => f.write_str("WriteInput::Zero"),
            WriteInput::Data(d) => write!(f, "WriteInput::Data({} bytes)", d.len()),
        }
    }
}

/// Backend-reported sizing information, as returned by [`BlockStore::detect_sizes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStoreSizes {
    pub file_size: u64,
    pub block_size: usize,
}

/// Generalized interface for the numbered, fixed-size block store that a layer such as
/// [`crate::EcProtect`] wraps, and which it also implements, so that block-store layers can be
/// stacked arbitrarily.
pub trait BlockStore: Send + Sync {
    /// The error type returned by this store's operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads `block_size` bytes for `block_num` into `dst`.
    ///
    /// If `expect_md5` is supplied, implementations are expected to fail with a staleness error
    /// when the MD5 of the data actually fetched does not match.
    fn read_block(
        &self,
        block_num: u64,
        dst: &mut [u8],
        expect_md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error>;

    /// Writes `block_size` bytes for `block_num`.
    ///
    /// `src = None` means delete (store-level zero elision). `md5`, when supplied, is the
    /// precomputed digest of the data, sparing the backend from recomputing it.
    fn write_block(
        &self,
        block_num: u64,
        src: Option<&[u8]>,
        md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error>;

    /// Returns the backend's notion of the overall file size and per-block size.
    fn detect_sizes(&self) -> Result<BlockStoreSizes, Self::Error>;

    /// Tears down this store. Must only be called once all outstanding calls have returned.
    fn destroy(&self) -> Result<(), Self::Error>;
}
