use std::process::ExitCode;

fn main() -> ExitCode {
  match roster_core::run(
    std::env::args_os().collect()
  ) {
    | Ok(()) => ExitCode::SUCCESS,
    | Err(err) => {
      eprintln!("roster: {err:#}");
      ExitCode::FAILURE
    }
  }
}
