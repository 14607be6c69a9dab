//! A minimal loadable module: on initialize, it taps the `"greeting"`
//! event and logs every payload it's handed.

use monarch::core::module::ModuleContext;
use monarch::core::Module;
use monarch::Value;

#[monarch::module]
pub struct HelloModule {
    greeted: std::sync::atomic::AtomicUsize,
}

impl Module for HelloModule {
    const NAME: &'static str = "hello";
    const VERSION: &'static str = "0.1.0";

    fn new() -> Self {
        HelloModule {
            greeted: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn initialize(&mut self, context: &ModuleContext) -> Result<(), String> {
        context.events().observe("greeting", None, |event| {
            log::info!("hello-module received greeting: {:?}", event.payload);
        });
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), String> {
        log::info!(
            "hello-module cleaning up after {} greeting(s)",
            self.greeted.load(std::sync::atomic::Ordering::Relaxed)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monarch::core::dispatcher::DispatcherConfig;
    use monarch::core::event::EventController;
    use monarch::core::fiber::FiberScheduler;
    use monarch::core::kernel::Kernel;
    use std::time::Duration;

    #[test]
    fn declared_metadata_is_registered_via_linkme() {
        let descriptors = monarch::core::module::registry::all();
        assert!(descriptors.iter().any(|d| d.name == "hello"));
    }

    #[test]
    fn module_initializes_and_observes_events() {
        let kernel = Kernel::new(DispatcherConfig {
            pool_size: 1,
            jobs_per_thread: 1,
        });
        let fibers = FiberScheduler::start(kernel.clone(), 1);
        let events = EventController::new(kernel.clone());
        let context = ModuleContext::new(kernel.clone(), fibers.clone(), events.clone());

        let mut module = HelloModule::new();
        module.initialize(&context).unwrap();

        let value: Value = "hi".into();
        events.schedule("greeting", value);
        std::thread::sleep(Duration::from_millis(50));

        fibers.shutdown();
        kernel.terminate();
    }
}
