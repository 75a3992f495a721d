//! Call native functions that are only known at runtime: a raw address, a
//! declared return type, an ordered list of declared argument types and a
//! calling convention.
//!
//! [`Value`] carries one argument or result, [`CallFrame`] packs values
//! into register-width slots, [`ForeignFn`] dispatches through a fixed
//! table of typed prototypes and interprets the raw return. [`Library`]
//! loads modules and resolves the addresses, [`memory`] reads and writes
//! the bytes behind returned pointers.
//!
//! None of this can verify a declaration against the real function. A
//! wrong declared signature is undefined behavior with process-killing
//! potential, exactly like a wrong hand-written `extern` block; the unsafe
//! call boundary is [`ForeignFn::call`] and its contract is documented
//! there.

mod foreign;
mod frame;
mod library;
pub mod memory;
mod trampoline;
mod types;
mod value;

pub use foreign::*;
pub use frame::*;
pub use library::*;
pub use trampoline::RawFn;
pub use types::*;
pub use value::*;
