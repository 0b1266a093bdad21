use std::process::ExitCode;

use multidc::ui::output;

fn main() -> ExitCode {
    match multidc::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
