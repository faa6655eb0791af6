fn main() {
    tracing_subscriber::fmt::init();

    csec_tui_lib::run();
}
