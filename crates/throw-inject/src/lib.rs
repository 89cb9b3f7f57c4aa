//! Fault injection via runtime patching of registered throw-sites.
//!
//! See `SPEC_FULL.md` for the full design. In short: [`register_and_raise!`]
//! marks a location that unconditionally raises an error, and records
//! enough information for a [`Forcer`] to later force that same error (or a
//! caller-supplied substitute) to be raised on every subsequent entry to the
//! enclosing function, without running the function's own body.

mod address_space;
mod codegen;
mod error;
mod forcer;
mod icache;
mod protect;
mod registry;
mod symbols;
mod trampoline;

pub use error::{ClonableError, ForceError, ImageError};
pub use forcer::{FunctionInfo, Forcer, SiteInfo};

#[doc(hidden)]
pub mod __private {
    pub use crate::registry::{ReconstructFn, ThrowSite, THROW_LOCATIONS};
    pub use std::sync::atomic::AtomicUsize;
}

/// Captures the address of the instruction immediately following this
/// macro's expansion point, inside whatever function called it.
///
/// Ports the original C++ design's `&&label` computed-goto address capture
/// (see `SPEC_FULL.md` §1/§4.A). Rust has no constant-expression equivalent,
/// so this runs a local-label address computation (`lea`/`adr`) at the call
/// site itself, guaranteeing the captured address lies inside the caller's
/// own machine code rather than in a separate helper function.
#[macro_export]
#[doc(hidden)]
macro_rules! __capture_throw_addr {
    () => {{
        let addr: usize;
        $crate::__private_capture_addr!(addr);
        addr
    }};
}

#[cfg(target_arch = "x86_64")]
#[macro_export]
#[doc(hidden)]
macro_rules! __private_capture_addr {
    ($out:ident) => {
        unsafe {
            ::std::arch::asm!("2: lea {0}, [rip + 2b]", out(reg) $out);
        }
    };
}

#[cfg(target_arch = "aarch64")]
#[macro_export]
#[doc(hidden)]
macro_rules! __private_capture_addr {
    ($out:ident) => {
        unsafe {
            ::std::arch::asm!("2: adr {0}, 2b", out(reg) $out);
        }
    };
}

#[cfg(all(target_arch = "arm", target_feature = "thumb-mode"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __private_capture_addr {
    ($out:ident) => {
        unsafe {
            ::std::arch::asm!("2: adr {0}, 2b", out(reg) $out);
        }
    };
}

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    all(target_arch = "arm", target_feature = "thumb-mode")
)))]
#[macro_export]
#[doc(hidden)]
macro_rules! __private_capture_addr {
    ($out:ident) => {
        $out = 0usize;
    };
}

/// Marks a throw site. Evaluates `$ctor(args…)` and unconditionally raises
/// it, exactly as if the macro were not there, while additionally:
///
/// 1. registering a [`crate::__private::ThrowSite`] descriptor into the
///    program-wide site table, keyed by this call's own runtime address;
/// 2. when every argument is a Rust `literal` token, also registering a
///    stateless reconstructor so `Forcer::force` can replay this exact
///    error without the caller supplying one.
///
/// # Examples
///
/// ```ignore
/// fn throw_if_nonzero(n: i32) -> Result<(), MyError> {
///     if n != 0 {
///         register_and_raise!(MyError::Overflow(n));
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! register_and_raise {
    ($ctor:path ( $($arg:literal),* $(,)? )) => {{
        #[linkme::distributed_slice($crate::__private::THROW_LOCATIONS)]
        static __THROW_SITE: &'static $crate::__private::ThrowSite = &__THROW_SITE_DESCRIPTOR;

        static __THROW_SITE_DESCRIPTOR: $crate::__private::ThrowSite = $crate::__private::ThrowSite {
            throw_addr: $crate::__private::AtomicUsize::new(0),
            file: ::core::file!(),
            line: ::core::line!(),
            expr: ::core::concat!(::core::stringify!($ctor), "(", ::core::stringify!($($arg),*), ")"),
            reconstruct: ::core::option::Option::Some(__reconstruct),
        };

        fn __reconstruct() -> ::std::boxed::Box<dyn $crate::ClonableError> {
            ::std::boxed::Box::new($ctor($($arg),*))
        }

        let __addr = $crate::__capture_throw_addr!();
        __THROW_SITE_DESCRIPTOR.record_throw_addr(__addr);
        ::std::panic::panic_any(::std::panic::AssertUnwindSafe(
            ::std::boxed::Box::new($ctor($($arg),*)) as ::std::boxed::Box<dyn $crate::ClonableError>
        ));
    }};
    ($ctor:path ( $($arg:expr),* $(,)? )) => {{
        #[linkme::distributed_slice($crate::__private::THROW_LOCATIONS)]
        static __THROW_SITE: &'static $crate::__private::ThrowSite = &__THROW_SITE_DESCRIPTOR;

        static __THROW_SITE_DESCRIPTOR: $crate::__private::ThrowSite = $crate::__private::ThrowSite {
            throw_addr: $crate::__private::AtomicUsize::new(0),
            file: ::core::file!(),
            line: ::core::line!(),
            expr: ::core::concat!(::core::stringify!($ctor), "(", ::core::stringify!($($arg),*), ")"),
            reconstruct: ::core::option::Option::None,
        };

        let __addr = $crate::__capture_throw_addr!();
        __THROW_SITE_DESCRIPTOR.record_throw_addr(__addr);
        ::std::panic::panic_any(::std::panic::AssertUnwindSafe(
            ::std::boxed::Box::new($ctor($($arg),*)) as ::std::boxed::Box<dyn $crate::ClonableError>
        ));
    }};
}
