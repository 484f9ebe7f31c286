use std::process::ExitCode;

fn main() -> ExitCode {
    caio_cli::run()
}
