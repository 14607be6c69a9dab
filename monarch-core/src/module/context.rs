//! What a module gets handed at `initialize` time: the kernel, the fiber
//! scheduler, and the event controller — the three subsystems a module
//! actually needs to register against. Each is cheap to clone, so a
//! module is free to keep its own copy past the `initialize` call.

use crate::event::EventController;
use crate::fiber::FiberScheduler;
use crate::kernel::Kernel;

#[derive(Clone)]
pub struct ModuleContext {
    kernel: Kernel,
    fibers: FiberScheduler,
    events: EventController,
}

impl ModuleContext {
    pub fn new(kernel: Kernel, fibers: FiberScheduler, events: EventController) -> Self {
        ModuleContext {
            kernel,
            fibers,
            events,
        }
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
}
