//! Packing values into raw call slots and unpacking raw returns.
//!
//! One slot is one register-sized word. Sub-word integers are promoted to a
//! full slot, eight-byte values split across two slots when the slot is four
//! bytes wide, low word first. Floats cross as bit patterns, never as a
//! numeric conversion.

use crate::types::{SlotWidth, ValueType};
use crate::value::Value;

/// One native call-frame word.
pub type RawSlot = usize;

/// Upper bound on slots a single call can pass. The dispatch table has one
/// prototype per count from zero to this.
pub const MAX_CALL_SLOTS: usize = 8;

/// Append the slot lanes for one value, left to right.
///
/// Lanes are produced at the requested width so 32-bit layout can be
/// checked anywhere; the high bits of a four-byte lane are always zero.
pub fn pack_value(value: &Value, width: SlotWidth, lanes: &mut Vec<u64>) {
    match value {
        Value::Void => {
            log::warn!("void argument marshaled as a zero slot");
            lanes.push(0);
        }
        Value::Bool(v) => push_slot(*v as u64, width, lanes),
        Value::I8(v) => push_slot((*v as i64).cast_unsigned(), width, lanes),
        Value::U8(v) => push_slot(*v as u64, width, lanes),
        Value::I16(v) => push_slot((*v as i64).cast_unsigned(), width, lanes),
        Value::U16(v) => push_slot(*v as u64, width, lanes),
        Value::I32(v) => push_slot((*v as i64).cast_unsigned(), width, lanes),
        Value::U32(v) => push_slot(*v as u64, width, lanes),
        Value::I64(v) => push_wide(v.cast_unsigned(), width, lanes),
        Value::U64(v) => push_wide(*v, width, lanes),
        Value::F32(v) => push_slot(v.to_bits() as u64, width, lanes),
        Value::F64(v) => push_wide(v.to_bits(), width, lanes),
        Value::Pointer(addr) => push_slot(*addr as u64, width, lanes),
        Value::Str(text) => push_slot(text.as_ptr() as u64, width, lanes),
        Value::WStr(units) => push_slot(units.as_ptr() as u64, width, lanes),
        Value::Buffer(bytes) => push_slot(bytes.as_ptr() as u64, width, lanes),
    }
}

/// One lane, truncated to the slot width. Sign extension already happened
/// in the 64-bit domain, so masking keeps exactly the bits the slot holds.
fn push_slot(bits: u64, width: SlotWidth, lanes: &mut Vec<u64>) {
    lanes.push(bits & width.mask());
}

/// An eight-byte value: one lane on wide slots, otherwise split with the
/// low word first, matching how a callee reads a stacked 64-bit argument.
fn push_wide(bits: u64, width: SlotWidth, lanes: &mut Vec<u64>) {
    match width {
        SlotWidth::Eight => lanes.push(bits),
        SlotWidth::Four => {
            lanes.push(bits & 0xFFFF_FFFF);
            lanes.push(bits >> 32);
        }
    }
}

/// A fully packed, zero-padded argument frame at native width.
///
/// Padding to [`MAX_CALL_SLOTS`] means a trampoline of any arity can read
/// its slots; positions nothing was packed into are zeros.
#[derive(Debug, Clone)]
pub struct CallFrame {
    slots: [RawSlot; MAX_CALL_SLOTS],
}

impl CallFrame {
    pub fn marshal(args: &[Value]) -> CallFrame {
        let mut lanes = Vec::with_capacity(MAX_CALL_SLOTS);
        for value in args {
            pack_value(value, SlotWidth::NATIVE, &mut lanes);
        }
        if lanes.len() > MAX_CALL_SLOTS {
            log::warn!(
                "{} argument slots supplied, only the first {} can be passed",
                lanes.len(),
                MAX_CALL_SLOTS
            );
        }
        let mut slots = [0; MAX_CALL_SLOTS];
        for (slot, lane) in slots.iter_mut().zip(&lanes) {
            *slot = *lane as RawSlot;
        }
        CallFrame { slots }
    }

    #[inline]
    pub fn slots(&self) -> &[RawSlot; MAX_CALL_SLOTS] {
        &self.slots
    }
}

/// Interpret a raw return word as the declared kind.
///
/// Integers truncate to their declared width first; a callee only promises
/// the low bytes, anything above is garbage. Pointer-like kinds turn a null
/// address into `Void` so callers never mistake it for data; reading the
/// bytes behind a non-null address is an explicit follow-up through
/// [`crate::memory`].
pub fn unpack_return(kind: ValueType, raw: u64) -> Value {
    match kind {
        ValueType::Void => Value::Void,
        ValueType::Bool => Value::Bool(raw as u8 != 0),
        ValueType::I8 => Value::I8(raw as i8),
        ValueType::U8 => Value::U8(raw as u8),
        ValueType::I16 => Value::I16(raw as i16),
        ValueType::U16 => Value::U16(raw as u16),
        ValueType::I32 => Value::I32(raw as i32),
        ValueType::U32 => Value::U32(raw as u32),
        ValueType::I64 => Value::I64(raw.cast_signed()),
        ValueType::U64 => Value::U64(raw),
        ValueType::F32 => Value::F32(f32::from_bits(raw as u32)),
        ValueType::F64 => Value::F64(f64::from_bits(raw)),
        ValueType::Pointer
        | ValueType::Str
        | ValueType::WStr
        | ValueType::Buffer => {
            let addr = raw as usize;
            if addr == 0 {
                Value::Void
            } else {
                Value::Pointer(addr)
            }
        }
    }
}

#[cfg(test)]
mod marshal_tests {
    use super::*;

    fn lanes_of(value: Value, width: SlotWidth) -> Vec<u64> {
        let mut lanes = Vec::new();
        pack_value(&value, width, &mut lanes);
        lanes
    }

    #[test]
    fn u64_splits_low_word_first_at_width_four() {
        let lanes =
            lanes_of(Value::U64(0x0102_0304_0506_0708), SlotWidth::Four);
        assert_eq!(lanes, vec![0x0506_0708, 0x0102_0304]);
    }

    #[test]
    fn u64_is_a_single_lane_at_width_eight() {
        let lanes =
            lanes_of(Value::U64(0x0102_0304_0506_0708), SlotWidth::Eight);
        assert_eq!(lanes, vec![0x0102_0304_0506_0708]);
    }

    #[test]
    fn i64_min_splits_into_zero_and_sign_word() {
        let lanes = lanes_of(Value::I64(i64::MIN), SlotWidth::Four);
        assert_eq!(lanes, vec![0, 0x8000_0000]);
    }

    #[test]
    fn signed_sub_word_sign_extends_to_the_slot() {
        assert_eq!(
            lanes_of(Value::I8(-1), SlotWidth::Four),
            vec![0xFFFF_FFFF]
        );
        assert_eq!(
            lanes_of(Value::I8(-1), SlotWidth::Eight),
            vec![u64::MAX]
        );
        assert_eq!(
            lanes_of(Value::I16(-2), SlotWidth::Eight),
            vec![0xFFFF_FFFF_FFFF_FFFE]
        );
        assert_eq!(
            lanes_of(Value::I32(-5), SlotWidth::Four),
            vec![0xFFFF_FFFB]
        );
    }

    #[test]
    fn unsigned_sub_word_zero_extends() {
        assert_eq!(lanes_of(Value::U8(0xFF), SlotWidth::Eight), vec![0xFF]);
        assert_eq!(
            lanes_of(Value::U16(0xFFFF), SlotWidth::Four),
            vec![0xFFFF]
        );
    }

    #[test]
    fn bool_is_one_or_zero() {
        assert_eq!(lanes_of(Value::Bool(true), SlotWidth::Eight), vec![1]);
        assert_eq!(lanes_of(Value::Bool(false), SlotWidth::Four), vec![0]);
    }

    #[test]
    fn f32_crosses_as_its_bit_pattern() {
        assert_eq!(
            lanes_of(Value::F32(1.5), SlotWidth::Eight),
            vec![0x3FC0_0000]
        );
        let nan = f32::from_bits(0x7FC0_1234);
        assert_eq!(
            lanes_of(Value::F32(nan), SlotWidth::Four),
            vec![0x7FC0_1234]
        );
    }

    #[test]
    fn f64_splits_like_an_integer_at_width_four() {
        let lanes = lanes_of(Value::F64(1.0), SlotWidth::Four);
        assert_eq!(lanes, vec![0, 0x3FF0_0000]);
    }

    #[test]
    fn string_lane_is_the_owned_storage_address() {
        let value = Value::cstring("abc");
        let expected = match &value {
            Value::Str(text) => text.as_ptr() as u64,
            other => panic!("expected Str, got {other:?}"),
        };
        let mut lanes = Vec::new();
        pack_value(&value, SlotWidth::NATIVE, &mut lanes);
        assert_eq!(lanes, vec![expected]);
    }

    #[test]
    fn buffer_lane_is_the_vector_address() {
        let value = Value::buffer(vec![9, 8, 7]);
        if let Value::Buffer(bytes) = &value {
            let mut lanes = Vec::new();
            pack_value(&value, SlotWidth::NATIVE, &mut lanes);
            assert_eq!(lanes, vec![bytes.as_ptr() as u64]);
        }
    }

    #[test]
    fn void_argument_packs_one_zero_lane() {
        assert_eq!(lanes_of(Value::Void, SlotWidth::Eight), vec![0]);
    }

    #[test]
    fn frame_pads_unused_slots_with_zeros() {
        let frame = CallFrame::marshal(&[Value::U32(7)]);
        assert_eq!(frame.slots()[0], 7);
        assert!(frame.slots()[1..].iter().all(|&slot| slot == 0));
    }

    #[test]
    fn frame_keeps_argument_order() {
        let frame = CallFrame::marshal(&[
            Value::U32(1),
            Value::U32(2),
            Value::U32(3),
        ]);
        assert_eq!(&frame.slots()[..3], &[1, 2, 3]);
    }

    #[test]
    fn frame_drops_lanes_past_the_table_bound() {
        let args: Vec<Value> = (0..10).map(|n| Value::U32(n + 1)).collect();
        let frame = CallFrame::marshal(&args);
        assert_eq!(frame.slots()[MAX_CALL_SLOTS - 1], 8);
    }
}
