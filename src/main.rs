use std::process::ExitCode;

fn main() -> ExitCode {
    match regsync::cli::run() {
        Ok(code) => code,
        Err(err) => {
            regsync::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
