//! A native function plus the signature the caller declared for it.
//!
//! `ForeignFn` is the call boundary: it counts the slots the declared
//! parameter types need, marshals whatever values were supplied, picks the
//! prototype for that slot count and convention, and interprets the raw
//! result as the declared return type. Nothing here checks the declaration
//! against the real function; there is nothing it could check it against.

use std::fmt;

use crate::frame::{CallFrame, MAX_CALL_SLOTS, unpack_return};
use crate::trampoline::{RawFn, dispatch_f32, dispatch_f64, dispatch_word};
use crate::types::{CallConvention, SlotWidth, ValueType};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    /// The declared parameter types need more slots than the dispatch
    /// table has prototypes for.
    SlotOverflow { required: usize, limit: usize },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::SlotOverflow { required, limit } => write!(
                f,
                "declared arguments occupy {required} call slots, at most {limit} are supported"
            ),
        }
    }
}

impl std::error::Error for CallError {}

/// A raw native function with a declared return type, parameter types and
/// calling convention.
///
/// The target address is borrowed conceptually: whoever produced it, a
/// [`crate::Library`] usually, must stay loaded for as long as calls
/// happen. A `ForeignFn` holds no per-call state and one instance may be
/// called from any number of threads at once.
pub struct ForeignFn {
    target: RawFn,
    ret: ValueType,
    params: Vec<ValueType>,
    convention: CallConvention,
}

// a code address is position-fixed; sharing it across threads is fine,
// whether the callee tolerates that is the caller's contract
unsafe impl Send for ForeignFn {}
unsafe impl Sync for ForeignFn {}

impl ForeignFn {
    /// Wrap a raw address. The declaration is stored as given; no probing,
    /// no validation.
    pub fn new(
        target: RawFn,
        ret: ValueType,
        params: Vec<ValueType>,
        convention: CallConvention,
    ) -> ForeignFn {
        ForeignFn {
            target,
            ret,
            params,
            convention,
        }
    }

    #[inline]
    pub fn target(&self) -> RawFn {
        self.target
    }

    #[inline]
    pub fn return_type(&self) -> ValueType {
        self.ret
    }

    #[inline]
    pub fn param_types(&self) -> &[ValueType] {
        &self.params
    }

    #[inline]
    pub fn convention(&self) -> CallConvention {
        self.convention
    }

    /// Slots the declared parameter list occupies on this host. This and
    /// only this number decides which prototype runs; the supplied values
    /// never change it.
    pub fn declared_slots(&self) -> usize {
        self.params
            .iter()
            .map(|param| param.slot_count(SlotWidth::NATIVE))
            .sum()
    }

    /// Call the target with the supplied values.
    ///
    /// Missing trailing arguments read as zero slots, surplus values are
    /// packed but never passed. A null target is a deliberate no-op that
    /// produces the declared return type's zero value. Float arguments
    /// travel as bit patterns in ordinary argument positions, the stacked
    /// layout of the slot model; the callee is expected to pick the bits
    /// up from there, not from a float register.
    ///
    /// # Safety
    /// The declared signature must describe the real function: its
    /// convention, its parameter widths and its return width. The target
    /// must stay executable for the duration of the call. Any mismatch is
    /// undefined behavior, the same as writing the wrong `extern` block by
    /// hand.
    pub unsafe fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        let required = self.declared_slots();
        if required > MAX_CALL_SLOTS {
            return Err(CallError::SlotOverflow {
                required,
                limit: MAX_CALL_SLOTS,
            });
        }
        if self.target.is_null() {
            log::debug!(
                "null target, yielding zero {} without a call",
                self.ret.name()
            );
            return Ok(unpack_return(self.ret, 0));
        }

        let frame = CallFrame::marshal(args);
        let value = match self.ret {
            ValueType::F32 => {
                let raw = unsafe {
                    dispatch_f32(self.convention, self.target, &frame, required)
                };
                Value::F32(raw)
            }
            ValueType::F64 => {
                let raw = unsafe {
                    dispatch_f64(self.convention, self.target, &frame, required)
                };
                Value::F64(raw)
            }
            _ => {
                let raw = unsafe {
                    dispatch_word(self.convention, self.target, &frame, required)
                };
                unpack_return(self.ret, raw)
            }
        };
        Ok(value)
    }
}

impl fmt::Debug for ForeignFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> =
            self.params.iter().map(|p| p.name()).collect();
        write!(
            f,
            "ForeignFn({:p} {} ({}) -> {})",
            self.target,
            self.convention.name(),
            params.join(", "),
            self.ret.name()
        )
    }
}
