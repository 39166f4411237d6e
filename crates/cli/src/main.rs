use std::process::ExitCode;

fn main() -> ExitCode {
    carhaul_cli::run()
}
