/// Routes crate logs to the test writer so a failing run shows the
/// structured events emitted along the way. Safe to call from every test;
/// later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
