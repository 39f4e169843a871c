fn main() {
    if let Err(err) = roster_enrich::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
