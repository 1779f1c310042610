//! Unit square from a vertex buffer, with per-vertex colors passed between
//! stages.

use firstlight_demos::scenes::VertexBufferScene;
use firstlight_demos::{run, DemoConfig};
use firstlight_engine::logging::{init_logging, LoggingConfig};

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(e) = run(DemoConfig::new("firstlight: vertex buffer"), VertexBufferScene) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
