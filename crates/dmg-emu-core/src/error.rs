use thiserror::Error;

/// Failure while loading a cartridge image. The machine keeps whatever it was
/// running before the failed load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM image is {len} bytes, expected at least 0x8000")]
    RomTooSmall { len: usize },
    #[error("unsupported cartridge type 0x{0:02X}")]
    UnsupportedCartridgeType(u8),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while decoding or applying a save state. Nothing is applied when
/// one of these is returned.
#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("not a save state (bad magic)")]
    BadMagic,
    #[error("save state version {found} does not match supported version {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("save state truncated: need {needed} bytes, got {len}")]
    Truncated { needed: usize, len: usize },
    #[error("save state has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("save state field {field} out of range: {value}")]
    FieldOutOfRange { field: &'static str, value: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;
pub type SaveStateResult<T> = Result<T, SaveStateError>;
