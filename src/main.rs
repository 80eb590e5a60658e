//! promforge CLI binary
//!
//! The minimal entrypoint for the promforge CLI. All logic is in the
//! library; main.rs only invokes cli::run() and maps failure to the
//! process exit code.

fn main() {
    if let Err(code) = promforge::cli::run() {
        std::process::exit(code);
    }
}
