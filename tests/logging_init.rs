//! Global subscriber installation. Kept in its own test binary because the
//! subscriber is process-wide and would clash with `#[traced_test]`.

use landfall_camera::logging::{init_tracing, LogFormat};

#[test]
fn init_tracing_installs_once() {
    assert!(init_tracing("info", LogFormat::Pretty));
    assert!(!init_tracing("debug", LogFormat::Json));
    tracing::info!("still logging after a repeated init");
}
