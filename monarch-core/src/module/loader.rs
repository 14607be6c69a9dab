//! Opens a single module image with `dlopen` and exposes its descriptor as
//! owned Rust data.

use std::ffi::CStr;
use std::path::Path;

use dlopen::wrapper::Container;

use crate::error::{Error, ExternalError};
use crate::module::abi::ModuleApi;

/// Owned copy of a [`crate::module::abi::ModuleDescriptor`]; safe to keep
/// around after the borrowed C strings it was built from go out of scope.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
}

/// A dlopen'd module image, not yet instantiated.
pub struct LoadedImage {
    pub info: ModuleInfo,
    pub api: Container<ModuleApi>,
}

/// Opens `path` and reads its descriptor, without creating a module
/// instance.
pub fn open(path: &Path) -> Result<LoadedImage, Error> {
    let api: Container<ModuleApi> = unsafe { Container::load(path) }.map_err(|e| {
        Error::External(ExternalError::new(
            format!("failed to load module image {}", path.display()),
            e,
        ))
    })?;

    let descriptor = unsafe { api.monarch_module_describe() };
    let info = unsafe { describe_to_owned(&descriptor) }?;

    Ok(LoadedImage { info, api })
}

unsafe fn describe_to_owned(
    descriptor: &crate::module::abi::ModuleDescriptor,
) -> Result<ModuleInfo, Error> {
    let name = c_str_to_string(descriptor.name, "module name")?;
    let version = c_str_to_string(descriptor.version, "module version")?;

    let mut dependencies = Vec::with_capacity(descriptor.dependency_count);
    for i in 0..descriptor.dependency_count {
        let ptr = *descriptor.dependencies.add(i);
        dependencies.push(c_str_to_string(ptr, "module dependency name")?);
    }

    Ok(ModuleInfo {
        name,
        version,
        dependencies,
    })
}

unsafe fn c_str_to_string(ptr: *const std::os::raw::c_char, what: &str) -> Result<String, Error> {
    if ptr.is_null() {
        return Err(Error::ProtocolMisuse(format!("{what} was null")));
    }
    Ok(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}
