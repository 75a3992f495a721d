//! Raw memory helpers for the embedding side: scratch allocations to pass
//! as `pointer`/`buffer` arguments and typed peeks/pokes to pick results
//! apart.
//!
//! Addresses are plain `usize` plus a byte offset, reads and writes are
//! unaligned. Nothing here checks bounds; the caller knows the allocation.

use std::ffi::CString;

use libc::c_void;

/// Allocate `size` zeroed bytes. Returns null for a zero size or when the
/// allocator fails, so a null check covers both.
pub fn alloc(size: usize) -> *mut u8 {
    if size == 0 {
        return std::ptr::null_mut();
    }
    // SAFETY: plain C allocation of `size` bytes
    let p = unsafe { libc::malloc(size) } as *mut u8;
    if !p.is_null() {
        // SAFETY: p covers `size` freshly allocated bytes
        unsafe { p.write_bytes(0, size) };
    }
    p
}

/// Release an [`alloc`] result. Null is tolerated.
///
/// # Safety
/// `ptr` must come from [`alloc`] and must not be freed twice.
pub unsafe fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    unsafe { libc::free(ptr as *mut c_void) };
}

macro_rules! typed_read {
    ($name:ident, $ty:ty) => {
        /// # Safety
        /// `addr + offset` must be readable for the width of the type.
        pub unsafe fn $name(addr: usize, offset: usize) -> $ty {
            let p = (addr + offset) as *const $ty;
            // SAFETY: the caller vouches for the address
            unsafe { p.read_unaligned() }
        }
    };
}

macro_rules! typed_write {
    ($name:ident, $ty:ty) => {
        /// # Safety
        /// `addr + offset` must be writable for the width of the type.
        pub unsafe fn $name(addr: usize, offset: usize, value: $ty) {
            let p = (addr + offset) as *mut $ty;
            // SAFETY: the caller vouches for the address
            unsafe { p.write_unaligned(value) };
        }
    };
}

typed_read!(read_u8, u8);
typed_read!(read_i8, i8);
typed_read!(read_u16, u16);
typed_read!(read_i16, i16);
typed_read!(read_u32, u32);
typed_read!(read_i32, i32);
typed_read!(read_u64, u64);
typed_read!(read_i64, i64);
typed_read!(read_f32, f32);
typed_read!(read_f64, f64);
typed_read!(read_pointer, usize);

typed_write!(write_u8, u8);
typed_write!(write_i8, i8);
typed_write!(write_u16, u16);
typed_write!(write_i16, i16);
typed_write!(write_u32, u32);
typed_write!(write_i32, i32);
typed_write!(write_u64, u64);
typed_write!(write_i64, i64);
typed_write!(write_f32, f32);
typed_write!(write_f64, f64);
typed_write!(write_pointer, usize);

/// Copy a returned C string into owned memory. Null is the explicit
/// no-value address and maps to `None`.
///
/// # Safety
/// A non-zero `addr` must point at a NUL-terminated byte string.
pub unsafe fn read_cstring(addr: usize) -> Option<CString> {
    if addr == 0 {
        return None;
    }
    // SAFETY: the caller vouches for the terminator
    let text = unsafe { std::ffi::CStr::from_ptr(addr as *const libc::c_char) };
    Some(text.to_owned())
}

/// Copy a returned UTF-16 string into an owned `String`, lossily where the
/// units are not valid UTF-16. Null maps to `None`.
///
/// # Safety
/// A non-zero `addr` must point at a zero-terminated `u16` sequence.
pub unsafe fn read_wstring(addr: usize) -> Option<String> {
    if addr == 0 {
        return None;
    }
    let mut units = Vec::new();
    let mut p = addr as *const u16;
    // SAFETY: the caller vouches for the terminator
    unsafe {
        loop {
            let unit = p.read_unaligned();
            if unit == 0 {
                break;
            }
            units.push(unit);
            p = p.add(1);
        }
    }
    Some(String::from_utf16_lossy(&units))
}
