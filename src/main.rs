use clap::Parser;
use mayavol::cmd::{self, Cli};
use sysexits::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cmd::serve(cli.args).await {
        Ok(()) => ExitCode::Ok,
        Err(e) => {
            if !tracing::dispatcher::has_been_set() {
                eprintln!("mayavol: {}", e);
            }
            error!(error = %e, "plugin failed");
            e.exit_code()
        }
    }
}
