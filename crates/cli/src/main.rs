use std::process::ExitCode;

fn main() -> ExitCode {
    khodroyar_cli::run()
}
