//! `monarchd`: a thin host for a Monarch microkernel. Loads the module
//! images found under the given paths, brings the kernel up, and runs
//! until told to stop.

use std::path::PathBuf;

use clap::Parser;
use monarch::config::{kernel_config_from, ConfigManager, ConfigSource, DefaultsSource, FileSource};
use monarch::core::microkernel::MicroKernel;
use monarch::Value;

#[derive(Parser, Debug)]
#[command(name = "monarchd", about = "Hosts a Monarch microkernel")]
struct Args {
    /// Directories to scan for module images, in addition to any listed
    /// in the config file.
    #[arg(long = "module-path")]
    module_paths: Vec<PathBuf>,

    /// TOML config file; missing is fine, it's merged as an empty layer.
    #[arg(long, default_value = "monarchd.toml")]
    config: PathBuf,

    /// Size of the operation dispatcher's thread pool.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() {
    monarch::log::log_init();

    let args = Args::parse();

    let sources: Vec<Box<dyn ConfigSource>> = vec![
        Box::new(DefaultsSource::new(Value::Map(Default::default()))),
        Box::new(FileSource::optional(&args.config)),
    ];
    let merged = match ConfigManager::merge(&sources) {
        Ok(value) => value,
        Err(err) => {
            log::error!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let mut kernel_config = kernel_config_from(&merged);
    kernel_config.module_paths.extend(args.module_paths);
    if let Some(threads) = args.threads {
        kernel_config.max_thread_count = threads;
    }

    log::info!(
        "starting monarchd with {} module path(s)",
        kernel_config.module_paths.len()
    );

    let microkernel = match MicroKernel::start(kernel_config) {
        Ok(mk) => mk,
        Err(err) => {
            log::error!("failed to start kernel: {err}");
            std::process::exit(1);
        }
    };

    log::info!("monarchd running; press enter to stop");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    microkernel.stop();
    log::info!("monarchd stopped");
}
