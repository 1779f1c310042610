//! Unit square read from a storage buffer instead of vertex attributes.

use firstlight_demos::scenes::StorageBufferScene;
use firstlight_demos::{run, DemoConfig};
use firstlight_engine::logging::{init_logging, LoggingConfig};

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(e) = run(DemoConfig::new("firstlight: storage buffer"), StorageBufferScene) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
