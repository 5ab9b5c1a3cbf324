//! Integration tests over synthetic containers

mod builder;
mod container;
mod model;
mod shaders;

/// Route decoder warnings to the test output; `RUST_LOG=debug` shows more
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
