/// Chime CLI
///
/// Runs and checks serialized generator programs.
use chime_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
