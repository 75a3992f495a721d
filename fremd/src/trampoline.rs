//! The fixed dispatch table: one typed prototype per slot count and
//! convention, reached by transmuting the raw target address.
//!
//! Returns come back through three prototype families. Integer and pointer
//! results use prototypes returning `u64`, which reads the full accumulator
//! pair on 32-bit targets. Float results use prototypes returning `f32` or
//! `f64` so the compiler reads the real float-return register instead of
//! reinterpreting an integer register.
//!
//! `extern "system"` is stdcall exactly where stdcall exists (32-bit
//! Windows) and plain C everywhere else, so the second family costs nothing
//! on targets where the distinction is gone.

use std::mem;

use crate::frame::{CallFrame, RawSlot};
use crate::types::CallConvention;

/// A raw code address. Nothing is known about it beyond what the caller
/// declared; calling through it is as unsafe as it sounds.
pub type RawFn = *const ();

macro_rules! dispatch_family {
    ($name:ident, $abi:literal, $ret:ty) => {
        unsafe fn $name(target: RawFn, frame: &CallFrame, slots: usize) -> $ret {
            let a = frame.slots();
            // SAFETY: the caller vouches that `target` is executable code
            // reachable under this prototype; every index is inside the
            // zero-padded frame.
            unsafe {
                match slots {
                    0 => mem::transmute::<RawFn, unsafe extern $abi fn() -> $ret>(
                        target,
                    )(),
                    1 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(RawSlot) -> $ret,
                    >(target)(a[0]),
                    2 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(RawSlot, RawSlot) -> $ret,
                    >(target)(a[0], a[1]),
                    3 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(RawSlot, RawSlot, RawSlot) -> $ret,
                    >(target)(a[0], a[1], a[2]),
                    4 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                        ) -> $ret,
                    >(target)(a[0], a[1], a[2], a[3]),
                    5 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                        ) -> $ret,
                    >(target)(a[0], a[1], a[2], a[3], a[4]),
                    6 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                        ) -> $ret,
                    >(target)(a[0], a[1], a[2], a[3], a[4], a[5]),
                    7 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                        ) -> $ret,
                    >(target)(a[0], a[1], a[2], a[3], a[4], a[5], a[6]),
                    8 => mem::transmute::<
                        RawFn,
                        unsafe extern $abi fn(
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                            RawSlot,
                        ) -> $ret,
                    >(target)(
                        a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7]
                    ),
                    _ => unreachable!("slot count checked before dispatch"),
                }
            }
        }
    };
}

dispatch_family!(c_word, "C", u64);
dispatch_family!(c_f32, "C", f32);
dispatch_family!(c_f64, "C", f64);
dispatch_family!(system_word, "system", u64);
dispatch_family!(system_f32, "system", f32);
dispatch_family!(system_f64, "system", f64);

/// # Safety
/// `target` must be callable with `slots` register-width arguments under
/// the given convention, and `slots` must not exceed
/// [`crate::MAX_CALL_SLOTS`].
pub(crate) unsafe fn dispatch_word(
    convention: CallConvention,
    target: RawFn,
    frame: &CallFrame,
    slots: usize,
) -> u64 {
    match convention {
        CallConvention::StdCall => unsafe {
            system_word(target, frame, slots)
        },
        // fastcall has no dedicated path and rides the cdecl prototypes
        CallConvention::CDecl | CallConvention::FastCall => unsafe {
            c_word(target, frame, slots)
        },
    }
}

/// # Safety
/// As [`dispatch_word`], and the callee must really return a four-byte
/// float.
pub(crate) unsafe fn dispatch_f32(
    convention: CallConvention,
    target: RawFn,
    frame: &CallFrame,
    slots: usize,
) -> f32 {
    match convention {
        CallConvention::StdCall => unsafe { system_f32(target, frame, slots) },
        CallConvention::CDecl | CallConvention::FastCall => unsafe {
            c_f32(target, frame, slots)
        },
    }
}

/// # Safety
/// As [`dispatch_word`], and the callee must really return an eight-byte
/// float.
pub(crate) unsafe fn dispatch_f64(
    convention: CallConvention,
    target: RawFn,
    frame: &CallFrame,
    slots: usize,
) -> f64 {
    match convention {
        CallConvention::StdCall => unsafe { system_f64(target, frame, slots) },
        CallConvention::CDecl | CallConvention::FastCall => unsafe {
            c_f64(target, frame, slots)
        },
    }
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;
    use crate::value::Value;

    unsafe extern "C" fn forty_two() -> u64 {
        42
    }

    unsafe extern "C" fn sub2(a: usize, b: usize) -> u64 {
        (a - b) as u64
    }

    unsafe extern "C" fn sum8(
        a: usize,
        b: usize,
        c: usize,
        d: usize,
        e: usize,
        f: usize,
        g: usize,
        h: usize,
    ) -> u64 {
        (a + b + c + d + e + f + g + h) as u64
    }

    unsafe extern "C" fn quarter(bits: u64) -> f64 {
        f64::from_bits(bits) * 0.25
    }

    #[test]
    fn zero_arity_dispatch_reads_the_return_word() {
        let frame = CallFrame::marshal(&[]);
        let raw = unsafe {
            dispatch_word(
                CallConvention::CDecl,
                forty_two as *const (),
                &frame,
                0,
            )
        };
        assert_eq!(raw, 42);
    }

    #[test]
    fn slots_are_passed_in_packing_order() {
        let frame = CallFrame::marshal(&[Value::U64(40), Value::U64(2)]);
        let raw = unsafe {
            dispatch_word(CallConvention::CDecl, sub2 as *const (), &frame, 2)
        };
        assert_eq!(raw, 38);
    }

    #[test]
    fn full_width_dispatch_sees_all_eight_slots() {
        let args: Vec<Value> = (1..=8).map(Value::U64).collect();
        let frame = CallFrame::marshal(&args);
        let raw = unsafe {
            dispatch_word(CallConvention::CDecl, sum8 as *const (), &frame, 8)
        };
        assert_eq!(raw, 36);
    }

    #[test]
    fn f64_family_returns_through_the_float_register() {
        let frame = CallFrame::marshal(&[Value::F64(10.0)]);
        let out = unsafe {
            dispatch_f64(
                CallConvention::CDecl,
                quarter as *const (),
                &frame,
                1,
            )
        };
        assert_eq!(out, 2.5);
    }
}
