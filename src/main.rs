use std::process::ExitCode;

fn main() -> ExitCode {
    lake_ingest_lib::run()
}
