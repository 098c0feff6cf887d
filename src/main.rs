use std::process::ExitCode;

fn main() -> ExitCode {
    match unmarshal_filter::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
