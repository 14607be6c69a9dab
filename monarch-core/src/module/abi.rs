//! The C ABI a module image exports, and the typed wrapper
//! ([`dlopen`]'s [`WrapperApi`]) used to bind it after `dlopen`.
//!
//! A module crate built with `#[monarch::module]` (see the `monarch-macros`
//! crate) emits exactly these five `extern "C"` symbols, so the host
//! doesn't need to link the module's Rust type at compile time.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use dlopen::wrapper::WrapperApi;
use dlopen_derive::WrapperApi;

use crate::module::{Module, ModuleContext};

/// Raw, borrowed description of a module image. Field pointers are valid
/// only for the duration of the `monarch_module_describe` call that
/// produced them; callers must copy them into owned `String`s immediately.
#[repr(C)]
pub struct ModuleDescriptor {
    pub name: *const c_char,
    pub version: *const c_char,
    pub dependencies: *const *const c_char,
    pub dependency_count: usize,
}

/// Opaque handle to a [`ModuleContext`], passed into
/// `monarch_module_initialize` so a module can register operations,
/// fibers, and event taps against the running
/// [`crate::microkernel::MicroKernel`]. The concrete layout is private to
/// `monarch-core`; modules only ever see the pointer and must recover the
/// context through [`context_from_handle`].
#[repr(C)]
pub struct ModuleContextHandle {
    _private: [u8; 0],
}

/// Recovers the [`ModuleContext`] a `ModuleContextHandle` pointer was
/// built from.
///
/// # Safety
/// `ptr` must be the exact pointer `monarch_module_initialize` received
/// for the duration of that call; it is not valid before or after.
pub unsafe fn context_from_handle<'a>(ptr: *const ModuleContextHandle) -> &'a ModuleContext {
    &*(ptr as *const ModuleContext)
}

/// Builds a [`ModuleDescriptor`] for `T` by leaking owned C strings for its
/// name, version, and dependency list. Called once per `dlopen`, so the
/// leak is bounded by the number of distinct module images ever loaded.
pub fn describe<T: Module>() -> ModuleDescriptor {
    let name = CString::new(T::NAME)
        .expect("module name must not contain NUL")
        .into_raw() as *const c_char;
    let version = CString::new(T::VERSION)
        .expect("module version must not contain NUL")
        .into_raw() as *const c_char;
    let dependencies: Box<[*const c_char]> = T::DEPENDENCIES
        .iter()
        .map(|dep| {
            CString::new(*dep)
                .expect("dependency name must not contain NUL")
                .into_raw() as *const c_char
        })
        .collect();
    let dependency_count = dependencies.len();
    let dependencies = Box::into_raw(dependencies) as *const *const c_char;

    ModuleDescriptor {
        name,
        version,
        dependencies,
        dependency_count,
    }
}

#[derive(WrapperApi)]
pub struct ModuleApi {
    pub monarch_module_describe: unsafe extern "C" fn() -> ModuleDescriptor,
    pub monarch_module_create: unsafe extern "C" fn() -> *mut c_void,
    pub monarch_module_initialize:
        unsafe extern "C" fn(instance: *mut c_void, context: *const ModuleContextHandle) -> i32,
    pub monarch_module_cleanup: unsafe extern "C" fn(instance: *mut c_void) -> i32,
    pub monarch_module_destroy: unsafe extern "C" fn(instance: *mut c_void),
}
