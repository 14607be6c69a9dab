//! Starts a microkernel, loads whatever module images are found in the
//! directory given as the first argument (build `hello-module` as a
//! cdylib and point this at its `target/.../deps` directory to see it
//! greeted), posts a `"greeting"` event, and shuts down.

use std::path::PathBuf;

use monarch::core::microkernel::{Config, MicroKernel};
use monarch::Value;

fn main() {
    monarch::log::log_init();

    let module_dir = std::env::args().nth(1).map(PathBuf::from);

    let mut config = Config::default();
    if let Some(dir) = module_dir {
        config.module_paths.push(dir);
    }

    let microkernel = MicroKernel::start(config).expect("failed to start microkernel");
    log::info!(
        "loaded modules: {:?}",
        microkernel.modules().loaded_module_names()
    );

    microkernel
        .events()
        .schedule("greeting", Value::Str("hello from host".to_string()));
    std::thread::sleep(std::time::Duration::from_millis(100));

    microkernel.stop();
}
