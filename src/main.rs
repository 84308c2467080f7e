use std::process;

fn main() {
    if let Err(e) = kestrel::cli::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
