fn main() {
    if let Err(e) = mine_dashboard::app::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
