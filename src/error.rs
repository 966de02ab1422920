use snafu::Snafu;

/// Error returned by [`crate::EcProtect`]'s [`crate::BlockStore`] operations.
///
/// Generic over `E`, the inner store's own error type, the same way `ReaderError<T>` and
/// `WriterError<T>` are generic over the record type they operate on: ECP never retries or
/// reclassifies an inner failure (including staleness, which is a variant of `E` itself), it
/// only ever forwards it.
#[derive(Debug, Snafu)]
pub enum EcpError<E>
where
    E: std::error::Error + 'static,
{
    /// `block_size` was zero.
    #[snafu(display("block_size must be greater than zero"))]
    InvalidArgument,

    /// Allocating a cache entry (or the zero block) failed.
    #[snafu(display("failed to allocate a cache entry"))]
    OutOfMemory,

    /// The inner store returned an error; forwarded unchanged.
    #[snafu(display("inner store error: {source}"))]
    Inner { source: E },
}

impl<E> EcpError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, EcpError::InvalidArgument)
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, EcpError::OutOfMemory)
    }

    /// Returns the wrapped inner-store error, if this is an [`EcpError::Inner`].
    pub fn inner(&self) -> Option<&E> {
        match self {
            EcpError::Inner { source } => Some(source),
            _ => None,
        }
    }
}
