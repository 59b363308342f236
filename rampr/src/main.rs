mod cli;
mod http;
mod output;
mod run;
mod run_error;
mod scenario_yaml;
mod workloads;

use clap::Parser;
use mimalloc::MiMalloc;
use rampr_core::ExitCode;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success.as_i32(),
                _ => ExitCode::InvalidInput.as_i32(),
            };
            std::process::exit(code);
        }
    };

    let code = match cli.command {
        cli::Command::Run(args) => match run::run(args).await {
            Ok(code) => code.as_i32(),
            Err(err) => {
                eprintln!("{err}");
                err.exit_code().as_i32()
            }
        },
        cli::Command::Validate(args) => match run::validate(args).await {
            Ok(()) => ExitCode::Success.as_i32(),
            Err(err) => {
                eprintln!("{err:#}");
                ExitCode::InvalidInput.as_i32()
            }
        },
    };

    std::process::exit(code);
}
