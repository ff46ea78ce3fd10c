//! Binary entrypoint for the `hashlock` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Optional .env for HASHLOCK_FILE; absence is fine.
    let _ = dotenvy::dotenv();
    match hashlock::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
