//! Release matrix packager: builds, packages, signs and publishes a Rust
//! binary for every release target.

use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Process-wide TLS crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let exit_code = kodegen_bundler_matrix::cli::run().await;
    process::exit(exit_code);
}
