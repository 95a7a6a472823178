use std::process::ExitCode;

fn main() -> ExitCode {
    zeroclick_cli::run()
}
