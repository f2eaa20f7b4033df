//! bfs - command-line front end for branchfs

use std::process::ExitCode;

fn main() -> ExitCode {
    match branchfs::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            branchfs::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
