use clap::Parser;
use tabflow::app::{handle_fatal_error, init_logging, AppConfig};
use tabflow::cli::{execute_command, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let session_logs = cli.is_interactive()
        && !matches!(
            cli.command,
            Some(Commands::Run {
                no_session_log: true,
                ..
            })
        );

    let config = match AppConfig::new(verbose) {
        Ok(config) => config.with_session_logs(session_logs),
        Err(e) => handle_fatal_error(e, verbose),
    };
    let log_writer = match init_logging(&config) {
        Ok(writer) => writer,
        Err(e) => handle_fatal_error(e, verbose),
    };

    if let Err(e) = execute_command(cli, log_writer).await {
        handle_fatal_error(e, verbose);
    }
}
