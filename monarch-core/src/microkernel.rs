//! The top-level facade: owns the kernel, fiber scheduler, event
//! controller, and module library, and sequences their startup/shutdown.
//!
//! `start(config)` brings subsystems up in dependency order
//! (state/dispatcher, then fibers, then events, then modules); `stop()`
//! reverses it.

use std::path::PathBuf;

use crate::dispatcher::DispatcherConfig;
use crate::event::EventController;
use crate::fiber::FiberScheduler;
use crate::kernel::Kernel;
use crate::module::ModuleLibrary;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directories scanned for module images at startup.
    pub module_paths: Vec<PathBuf>,
    /// Size of the operation dispatcher's thread pool.
    pub max_thread_count: usize,
    /// Operations admitted per pool thread at once.
    pub jobs_per_thread: usize,
    /// Number of scheduler-loop operations driving cooperative fibers.
    pub fiber_worker_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_paths: Vec::new(),
            max_thread_count: 4,
            jobs_per_thread: 4,
            fiber_worker_count: 2,
        }
    }
}

/// The running system: a started [`MicroKernel`] owns live threads and
/// loaded module images until [`MicroKernel::stop`] is called.
pub struct MicroKernel {
    kernel: Kernel,
    fibers: FiberScheduler,
    events: EventController,
    modules: ModuleLibrary,
}

impl MicroKernel {
    /// Brings up the dispatcher, fiber scheduler, and event controller,
    /// then loads every module found under `config.module_paths`. If any
    /// module path fails to load, previously loaded paths from this call
    /// are unloaded and fiber/dispatcher resources are torn down before
    /// returning the error.
    pub fn start(config: Config) -> crate::error::Result<Self> {
        let kernel = Kernel::new(DispatcherConfig {
            pool_size: config.max_thread_count,
            jobs_per_thread: config.jobs_per_thread,
        });
        let fibers = FiberScheduler::start(kernel.clone(), config.fiber_worker_count);
        let events = EventController::new(kernel.clone());
        let modules = ModuleLibrary::new(kernel.clone(), fibers.clone(), events.clone());

        for path in &config.module_paths {
            if let Err(err) = modules.load_dir(path) {
                modules.unload_all();
                fibers.shutdown();
                kernel.terminate();
                return Err(err);
            }
        }

        Ok(MicroKernel {
            kernel,
            fibers,
            events,
            modules,
        })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn fibers(&self) -> &FiberScheduler {
        &self.fibers
    }

    pub fn events(&self) -> &EventController {
        &self.events
    }

    pub fn modules(&self) -> &ModuleLibrary {
        &self.modules
    }

    /// Unloads modules (reverse load order), stops the fiber scheduler,
    /// then drains and terminates the operation dispatcher. Blocks until
    /// every subsystem is quiescent.
    pub fn stop(&self) {
        self.modules.unload_all();
        self.fibers.shutdown();
        self.kernel.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_with_no_module_paths_succeeds() {
        let microkernel = MicroKernel::start(Config::default()).expect("start");
        microkernel.stop();
    }
}
