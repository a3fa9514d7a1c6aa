use std::process::ExitCode;

fn main() -> ExitCode {
    match egress_meter_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
