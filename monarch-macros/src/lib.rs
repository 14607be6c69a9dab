//! `#[monarch::module]`: marks a struct as a loadable Monarch module.
//!
//! The struct must separately `impl monarch::module::Module for Self`. This
//! attribute leaves that struct untouched and appends the five
//! `extern "C"` symbols `monarch-core`'s loader expects
//! (`monarch_module_describe`/`_create`/`_initialize`/`_cleanup`/`_destroy`),
//! plus a `linkme` distributed-slice registration so a module's own test
//! binary (built as an rlib, never dlopen'd) can still enumerate its
//! declared metadata.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Item, ItemStruct};

#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "`#[monarch::module]` takes no arguments; declare NAME/VERSION/DEPENDENCIES in the `Module` impl",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as Item);
    let strct: ItemStruct = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new_spanned(
                &other,
                "`#[monarch::module]` can only be applied to a struct",
            )
            .to_compile_error()
            .into();
        }
    };

    let ident = &strct.ident;
    let registry_ident = quote::format_ident!("__MONARCH_MODULE_DESC_{}", ident);

    let expanded = quote! {
        #strct

        #[::linkme::distributed_slice(::monarch_core::module::registry::MODULE_DESCRIPTORS)]
        #[linkme(crate = ::monarch_core::linkme)]
        static #registry_ident: ::monarch_core::module::registry::StaticDescriptor =
            ::monarch_core::module::registry::StaticDescriptor {
                name: <#ident as ::monarch_core::module::Module>::NAME,
                version: <#ident as ::monarch_core::module::Module>::VERSION,
                dependencies: <#ident as ::monarch_core::module::Module>::DEPENDENCIES,
            };

        #[no_mangle]
        pub unsafe extern "C" fn monarch_module_describe() -> ::monarch_core::module::abi::ModuleDescriptor {
            ::monarch_core::module::abi::describe::<#ident>()
        }

        #[no_mangle]
        pub unsafe extern "C" fn monarch_module_create() -> *mut ::std::ffi::c_void {
            let instance = ::std::boxed::Box::new(<#ident as ::monarch_core::module::Module>::new());
            ::std::boxed::Box::into_raw(instance) as *mut ::std::ffi::c_void
        }

        #[no_mangle]
        pub unsafe extern "C" fn monarch_module_initialize(
            instance: *mut ::std::ffi::c_void,
            context: *const ::monarch_core::module::abi::ModuleContextHandle,
        ) -> i32 {
            let instance = &mut *(instance as *mut #ident);
            let context = ::monarch_core::module::abi::context_from_handle(context);
            match <#ident as ::monarch_core::module::Module>::initialize(instance, context) {
                Ok(()) => 0,
                Err(message) => {
                    ::log::error!(
                        "module '{}' failed to initialize: {}",
                        <#ident as ::monarch_core::module::Module>::NAME,
                        message,
                    );
                    1
                }
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn monarch_module_cleanup(instance: *mut ::std::ffi::c_void) -> i32 {
            let instance = &mut *(instance as *mut #ident);
            match <#ident as ::monarch_core::module::Module>::cleanup(instance) {
                Ok(()) => 0,
                Err(message) => {
                    ::log::error!(
                        "module '{}' failed to clean up: {}",
                        <#ident as ::monarch_core::module::Module>::NAME,
                        message,
                    );
                    1
                }
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn monarch_module_destroy(instance: *mut ::std::ffi::c_void) {
            drop(::std::boxed::Box::from_raw(instance as *mut #ident));
        }
    };

    expanded.into()
}
