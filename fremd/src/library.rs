//! Loading shared libraries and resolving exported symbols.
//!
//! Unix goes through the `dl*` family, Windows through the Win32 loader.
//! Error text comes from the platform (`dlerror` / `FormatMessageA`) and is
//! passed along unchanged.

use std::ffi::CString;
use std::fmt;

use libc::c_void;

use crate::foreign::ForeignFn;
use crate::trampoline::RawFn;
use crate::types::{CallConvention, ValueType};

#[cfg(target_os = "windows")]
mod win {
    use libc::{c_char, c_int, c_void};

    pub const FORMAT_MESSAGE_FROM_SYSTEM: u32 = 0x1000;
    pub const FORMAT_MESSAGE_IGNORE_INSERTS: u32 = 0x200;

    unsafe extern "system" {
        pub fn LoadLibraryA(name: *const c_char) -> *mut c_void;
        pub fn GetModuleHandleA(name: *const c_char) -> *mut c_void;
        pub fn GetProcAddress(
            module: *mut c_void,
            name: *const c_char,
        ) -> *mut c_void;
        pub fn FreeLibrary(module: *mut c_void) -> c_int;
        pub fn GetLastError() -> u32;
        pub fn FormatMessageA(
            flags: u32,
            source: *const c_void,
            message_id: u32,
            language_id: u32,
            buffer: *mut c_char,
            size: u32,
            args: *mut c_void,
        ) -> u32;
    }
}

#[cfg(target_family = "unix")]
fn loader_message() -> String {
    // SAFETY: dlerror hands back a thread-local message buffer or null
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return String::from("unknown loader error");
    }
    // SAFETY: a non-null dlerror result is a NUL-terminated string
    let text = unsafe { std::ffi::CStr::from_ptr(msg) };
    text.to_string_lossy().into_owned()
}

#[cfg(target_os = "windows")]
fn loader_message() -> String {
    let code = unsafe { win::GetLastError() };
    let mut buffer = [0u8; 512];
    // SAFETY: the buffer pointer and length describe local storage
    let len = unsafe {
        win::FormatMessageA(
            win::FORMAT_MESSAGE_FROM_SYSTEM | win::FORMAT_MESSAGE_IGNORE_INSERTS,
            std::ptr::null(),
            code,
            0,
            buffer.as_mut_ptr() as *mut libc::c_char,
            buffer.len() as u32,
            std::ptr::null_mut(),
        )
    };
    if len == 0 {
        return format!("error code {code}");
    }
    String::from_utf8_lossy(&buffer[..len as usize])
        .trim_end()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    Open { path: String, message: String },
    Symbol { symbol: String, message: String },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Open { path, message } => {
                write!(f, "cannot load '{path}': {message}")
            }
            LibraryError::Symbol { symbol, message } => {
                write!(f, "cannot resolve '{symbol}': {message}")
            }
        }
    }
}

impl std::error::Error for LibraryError {}

/// One loaded module. Dropping it unloads the module, so every
/// [`ForeignFn`] resolved from it must be dropped first; the raw addresses
/// do not keep the library alive.
pub struct Library {
    path: String,
    handle: *mut c_void,
    owned: bool,
}

// the loader handle is process-global state; per-handle operations are
// thread-safe on both platforms
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Load the library at exactly `path`.
    pub fn open(path: &str) -> Result<Library, LibraryError> {
        let c_path = CString::new(path).map_err(|_| LibraryError::Open {
            path: path.to_string(),
            message: String::from("path contains an interior NUL byte"),
        })?;

        #[cfg(target_family = "unix")]
        // SAFETY: c_path is a valid NUL-terminated string
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW) };
        #[cfg(target_os = "windows")]
        // SAFETY: c_path is a valid NUL-terminated string
        let handle = unsafe { win::LoadLibraryA(c_path.as_ptr()) };

        if handle.is_null() {
            return Err(LibraryError::Open {
                path: path.to_string(),
                message: loader_message(),
            });
        }
        log::debug!("loaded {path}");
        Ok(Library {
            path: path.to_string(),
            handle,
            owned: true,
        })
    }

    /// Load a library by bare name, decorated with the platform prefix and
    /// suffix, letting the system search its own directories.
    pub fn open_system(name: &str) -> Result<Library, LibraryError> {
        Library::open(&decorated_name(name))
    }

    /// A handle for the running process image itself. Useful to reach
    /// symbols the executable already links, `libc` above all. The handle
    /// is not closed on drop.
    pub fn this_process() -> Result<Library, LibraryError> {
        #[cfg(target_family = "unix")]
        // SAFETY: a null filename asks for the main program's handle
        let handle = unsafe { libc::dlopen(std::ptr::null(), libc::RTLD_NOW) };
        #[cfg(target_os = "windows")]
        // SAFETY: a null module name asks for the main program's handle
        let handle = unsafe { win::GetModuleHandleA(std::ptr::null()) };

        if handle.is_null() {
            return Err(LibraryError::Open {
                path: String::from("<main>"),
                message: loader_message(),
            });
        }
        Ok(Library {
            path: String::from("<main>"),
            handle,
            owned: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve an exported function by name.
    pub fn symbol(&self, name: &str) -> Result<RawFn, LibraryError> {
        let c_name = CString::new(name).map_err(|_| LibraryError::Symbol {
            symbol: name.to_string(),
            message: String::from("name contains an interior NUL byte"),
        })?;

        #[cfg(target_family = "unix")]
        // SAFETY: handle is live, c_name is NUL-terminated
        let address = unsafe { libc::dlsym(self.handle, c_name.as_ptr()) };
        #[cfg(target_os = "windows")]
        // SAFETY: handle is live, c_name is NUL-terminated
        let address =
            unsafe { win::GetProcAddress(self.handle, c_name.as_ptr()) };

        if address.is_null() {
            return Err(LibraryError::Symbol {
                symbol: name.to_string(),
                message: loader_message(),
            });
        }
        log::debug!("resolved {name} in {}", self.path);
        Ok(address as RawFn)
    }

    /// Resolve an export by ordinal. Ordinals are a PE concept; elsewhere
    /// this is always an error.
    #[cfg(target_os = "windows")]
    pub fn symbol_by_ordinal(&self, ordinal: u16) -> Result<RawFn, LibraryError> {
        // an import-by-ordinal name pointer carries the ordinal in its
        // low word
        let name = ordinal as usize as *const libc::c_char;
        // SAFETY: handle is live; the loader recognizes ordinal pointers
        let address = unsafe { win::GetProcAddress(self.handle, name) };
        if address.is_null() {
            return Err(LibraryError::Symbol {
                symbol: format!("#{ordinal}"),
                message: loader_message(),
            });
        }
        Ok(address as RawFn)
    }

    /// Resolve an export by ordinal. Ordinals are a PE concept; elsewhere
    /// this is always an error.
    #[cfg(not(target_os = "windows"))]
    pub fn symbol_by_ordinal(&self, ordinal: u16) -> Result<RawFn, LibraryError> {
        Err(LibraryError::Symbol {
            symbol: format!("#{ordinal}"),
            message: String::from("ordinal lookup requires a PE module"),
        })
    }

    /// Resolve `name` and wrap it with the declared signature in one step.
    pub fn function(
        &self,
        name: &str,
        ret: ValueType,
        params: Vec<ValueType>,
        convention: CallConvention,
    ) -> Result<ForeignFn, LibraryError> {
        let target = self.symbol(name)?;
        Ok(ForeignFn::new(target, ret, params, convention))
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if !self.owned || self.handle.is_null() {
            return;
        }
        log::debug!("closing {}", self.path);
        #[cfg(target_family = "unix")]
        // SAFETY: handle came from dlopen and is closed exactly once
        let _ = unsafe { libc::dlclose(self.handle) };
        #[cfg(target_os = "windows")]
        // SAFETY: handle came from LoadLibraryA and is closed exactly once
        let _ = unsafe { win::FreeLibrary(self.handle) };
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Library({:?}, {:p})", self.path, self.handle)
    }
}

/// Turn a bare name into the platform's file name; names that already look
/// like a path or carry an extension pass through untouched.
fn decorated_name(name: &str) -> String {
    if name.contains('.') || name.contains('/') || name.contains('\\') {
        return name.to_string();
    }
    if cfg!(target_os = "windows") {
        format!("{name}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{name}.dylib")
    } else {
        format!("lib{name}.so")
    }
}
