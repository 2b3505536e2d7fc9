use std::process;

fn main() {
    if let Err(e) = copytask::cli::run() {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
