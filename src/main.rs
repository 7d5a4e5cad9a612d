fn main() {
    if let Err(e) = stage_ngin::app::run() {
        eprintln!("stage-ngin: {e:#}");
        std::process::exit(1);
    }
}
