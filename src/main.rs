fn main() {
    if let Err(e) = netboxgit::cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
