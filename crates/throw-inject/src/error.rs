use std::io;

/// Every failure mode a caller of [`crate::Forcer`] can observe.
///
/// Variants map 1:1 onto the error-kind table in the design doc: each one
/// names *when* it is raised and from which operation, not an internal
/// implementation type.
#[derive(Debug, thiserror::Error)]
pub enum ForceError {
    /// The process's own executable image could not be opened or parsed
    /// for symbol lookup.
    #[error("failed to open or parse the executable image: {0}")]
    ImageOpen(#[source] ImageError),

    /// `/proc/self/maps` (or platform equivalent) could not be read.
    #[error("failed to read the process memory map: {0}")]
    MapRead(#[source] io::Error),

    /// `force`/`unforce` was given an address that matches no registered
    /// throw-site.
    #[error("no throw-site is registered at {0:#x}")]
    UnknownSite(usize),

    /// `force(addr)` was called on a site whose `reconstruct` is absent and
    /// no substitute error was supplied.
    #[error("site at {0:#x} has no constexpr reconstructor; call force_with instead")]
    NoReconstructor(usize),

    /// The generated stub does not fit inside the enclosing function.
    #[error("generated stub ({stub_len} bytes) exceeds enclosing function size ({fn_len} bytes)")]
    StubTooLarge { stub_len: usize, fn_len: usize },

    /// The code generator could not encode the required relative jump.
    #[error("relative offset {offset:#x} cannot be encoded by the {arch} code generator")]
    OffsetOutOfRange { arch: &'static str, offset: i64 },

    /// The page-protection syscall failed.
    #[error("failed to change page protection: {0}")]
    ProtectFailed(#[source] io::Error),

    /// No code generator exists for the current architecture.
    #[error("unsupported architecture: {0}")]
    UnsupportedArch(&'static str),

    /// The containing function for a given file offset could not be found.
    #[error("no function contains file offset {0:#x}")]
    NoContainingFunction(u64),
}

/// Narrow error type for opening/parsing the executable image, kept
/// separate from [`ForceError`] so `Forcer::new`'s image-open failure can
/// carry the underlying `object`/IO error without a blanket `From<object::Error>`
/// on every other variant.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("object file parse error: {0}")]
    Object(#[from] object::Error),
}

/// A type-erased, clonable, `std::error::Error`. Forcing a site stores one
/// of these rather than a plain `Box<dyn Error>`: while a patch is
/// installed the forced function may be called any number of times, and
/// each call must raise an independently owned copy without re-running any
/// user code (the reconstructor, if any, is called exactly once, at
/// `force` time).
pub trait ClonableError: std::error::Error + Send + Sync + 'static {
    fn clone_box(&self) -> Box<dyn ClonableError>;
}

impl<E> ClonableError for E
where
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    fn clone_box(&self) -> Box<dyn ClonableError> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ClonableError> {
    fn clone(&self) -> Self {
        self.as_ref().clone_box()
    }
}
