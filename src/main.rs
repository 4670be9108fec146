use std::process::ExitCode;

use clap::Parser;
use deploy_apps::Pipeline;
use deploy_apps::cli::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(Cli::usage_exit_code(&e));
        }
    };
    let transcript = deploy_apps::logging::init(cli.verbose);

    let pipeline = Pipeline::new(cli.settings()).transcript(transcript);

    match pipeline.run(&cli.request()) {
        Ok(report) if report.exit_code() == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", anyhow::Error::from(e));
            ExitCode::FAILURE
        }
    }
}
