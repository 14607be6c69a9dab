//! Dependency-aware module loading and unloading.
//!
//! Modules are loaded in a batch, resolved into a load order by their
//! declared dependencies, and rolled back as a unit if the batch contains a
//! cycle, an unresolvable dependency, or an initialization failure.
//! Unloading reverses the recorded load order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::c_void;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use dlopen::wrapper::Container;

use crate::error::Error;
use crate::event::EventController;
use crate::fiber::FiberScheduler;
use crate::kernel::Kernel;
use crate::module::abi::{ModuleApi, ModuleContextHandle};
use crate::module::context::ModuleContext;
use crate::module::loader::{self, LoadedImage, ModuleInfo};

struct LoadedModule {
    info: ModuleInfo,
    api: Container<ModuleApi>,
    instance: *mut c_void,
    handle: *mut ModuleContext,
}

// The raw pointers are only ever touched while holding `ModuleLibrary::modules`'s lock.
unsafe impl Send for LoadedModule {}

/// Owns every currently loaded module image and the order they were loaded
/// in, so unloading can reverse it.
pub struct ModuleLibrary {
    context: ModuleContext,
    modules: Mutex<HashMap<String, LoadedModule>>,
    order: Mutex<Vec<String>>,
}

impl ModuleLibrary {
    /// `fibers` and `events` are the same instances the rest of the
    /// running [`crate::microkernel::MicroKernel`] uses, so taps and
    /// fibers a module registers during `initialize` take effect against
    /// the live system, not a throwaway copy.
    pub fn new(kernel: Kernel, fibers: FiberScheduler, events: EventController) -> Self {
        ModuleLibrary {
            context: ModuleContext::new(kernel, fibers, events),
            modules: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn loaded_module_names(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.lock().unwrap().contains_key(name)
    }

    /// Loads every module image directly inside `dir` (non-recursive) as a
    /// single dependency-resolved batch. On any failure, nothing from this
    /// call is left loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<String>, Error> {
        let candidate_paths = discover_images(dir)?;
        let mut images: Vec<LoadedImage> = Vec::with_capacity(candidate_paths.len());
        for path in &candidate_paths {
            images.push(loader::open(path)?);
        }

        let order = self.resolve_order(&images)?;
        let images: Vec<Option<LoadedImage>> = images.into_iter().map(Some).collect();
        self.load_in_order(images, order)
    }

    /// Computes a load order satisfying every candidate's declared
    /// dependencies via Kahn's algorithm. Dependencies already satisfied by
    /// previously loaded modules need no edge; a dependency absent from
    /// both the batch and the already-loaded set, or a cycle within the
    /// batch, is a [`Error::DependencyViolation`].
    fn resolve_order(&self, images: &[LoadedImage]) -> Result<Vec<String>, Error> {
        let already_loaded: HashSet<String> = self.modules.lock().unwrap().keys().cloned().collect();

        let mut seen_in_batch: HashSet<&str> = HashSet::with_capacity(images.len());
        for img in images {
            let name = img.info.name.as_str();
            if already_loaded.contains(name) {
                return Err(Error::DependencyViolation(format!(
                    "module '{name}' is already loaded"
                )));
            }
            if !seen_in_batch.insert(name) {
                return Err(Error::DependencyViolation(format!(
                    "duplicate module name '{name}' in the same load batch"
                )));
            }
        }

        let by_name: HashMap<&str, usize> = images
            .iter()
            .enumerate()
            .map(|(i, img)| (img.info.name.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; images.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); images.len()];

        for (i, img) in images.iter().enumerate() {
            for dep in &img.info.dependencies {
                if already_loaded.contains(dep) {
                    continue;
                }
                match by_name.get(dep.as_str()) {
                    Some(&dep_idx) => {
                        dependents[dep_idx].push(i);
                        in_degree[i] += 1;
                    }
                    None => {
                        return Err(Error::DependencyViolation(format!(
                            "module '{}' depends on '{}', which is neither loaded nor in this batch",
                            img.info.name, dep
                        )));
                    }
                }
            }
        }

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(images.len());

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != images.len() {
            let stuck: Vec<&str> = (0..images.len())
                .filter(|i| in_degree[*i] > 0)
                .map(|i| images[i].info.name.as_str())
                .collect();
            return Err(Error::DependencyViolation(format!(
                "dependency cycle among modules: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    fn load_in_order(
        &self,
        mut images: Vec<Option<LoadedImage>>,
        order: Vec<usize>,
    ) -> Result<Vec<String>, Error> {
        let mut loaded_names = Vec::with_capacity(order.len());
        let mut rollback: Vec<LoadedModule> = Vec::new();

        for idx in order {
            let image = images[idx].take().expect("each index visited once");
            let LoadedImage { info, api } = image;

            let instance = unsafe { api.monarch_module_create() };
            let handle = Box::into_raw(Box::new(self.context.clone()));

            let init_result = unsafe {
                api.monarch_module_initialize(instance, handle as *const ModuleContextHandle)
            };
            if init_result != 0 {
                unsafe {
                    api.monarch_module_destroy(instance);
                    drop(Box::from_raw(handle));
                }
                self.rollback(rollback);
                return Err(Error::DependencyViolation(format!(
                    "module '{}' failed to initialize (code {init_result})",
                    info.name
                )));
            }

            loaded_names.push(info.name.clone());
            rollback.push(LoadedModule {
                info,
                api,
                instance,
                handle,
            });
        }

        let mut modules = self.modules.lock().unwrap();
        let mut order_list = self.order.lock().unwrap();
        for module in rollback {
            order_list.push(module.info.name.clone());
            modules.insert(module.info.name.clone(), module);
        }

        Ok(loaded_names)
    }

    fn rollback(&self, modules: Vec<LoadedModule>) {
        for module in modules.into_iter().rev() {
            unsafe {
                let _ = module.api.monarch_module_cleanup(module.instance);
                module.api.monarch_module_destroy(module.instance);
                drop(Box::from_raw(module.handle));
            }
        }
    }

    /// Unloads a single module by name, regardless of load order. Fails
    /// with [`Error::DependencyViolation`] if any other loaded module still
    /// declares a dependency on `name`.
    pub fn unload(&self, name: &str) -> Result<(), Error> {
        let modules = self.modules.lock().unwrap();
        if !modules.contains_key(name) {
            return Err(Error::ProtocolMisuse(format!("module '{name}' is not loaded")));
        }
        let dependents: Vec<&str> = modules
            .iter()
            .filter(|(n, m)| n.as_str() != name && m.info.dependencies.iter().any(|d| d == name))
            .map(|(n, _)| n.as_str())
            .collect();
        if !dependents.is_empty() {
            return Err(Error::DependencyViolation(format!(
                "module '{name}' is still depended on by: {}",
                dependents.join(", ")
            )));
        }
        drop(modules);

        let module = self.modules.lock().unwrap().remove(name);
        match module {
            Some(module) => {
                self.order.lock().unwrap().retain(|n| n != name);
                unsafe {
                    let _ = module.api.monarch_module_cleanup(module.instance);
                    module.api.monarch_module_destroy(module.instance);
                    drop(Box::from_raw(module.handle));
                }
                Ok(())
            }
            None => Err(Error::ProtocolMisuse(format!("module '{name}' is not loaded"))),
        }
    }

    /// Unloads every module in the reverse of its load order.
    pub fn unload_all(&self) {
        let names: Vec<String> = self.order.lock().unwrap().drain(..).rev().collect();
        for name in names {
            if let Some(module) = self.modules.lock().unwrap().remove(&name) {
                unsafe {
                    let _ = module.api.monarch_module_cleanup(module.instance);
                    module.api.monarch_module_destroy(module.instance);
                    drop(Box::from_raw(module.handle));
                }
            }
        }
    }
}

impl Drop for ModuleLibrary {
    fn drop(&mut self) {
        self.unload_all();
    }
}

fn discover_images(dir: &Path) -> Result<Vec<std::path::PathBuf>, Error> {
    let extension = std::env::consts::DLL_EXTENSION;
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
