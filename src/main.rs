use clap::Parser;
use doc_explorer::cli::{Cli, Commands};
use doc_explorer::error::Result;
use doc_explorer::main_lib;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let settings = main_lib::load_settings(cli.settings.as_deref())?;
    let settings = settings.as_ref();

    match cli.command {
        Commands::Execute {
            config,
            command,
            output,
        } => main_lib::execute_command(&config, &command, output.as_deref(), settings),
        Commands::Script {
            config,
            script,
            output,
        } => {
            main_lib::run_script(&config, &script, output.as_deref(), settings)?;
            Ok(())
        }
        Commands::Views { config, view } => {
            main_lib::print_views(&config, view.as_deref(), settings)
        }
        Commands::Sample { output } => main_lib::save_sample_state(output.as_deref(), settings),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    // DOC_EXPLORER_LOG names a file to append debug logs to
    if let Ok(log_file) = std::env::var("DOC_EXPLORER_LOG") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        env_logger::Builder::new()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .filter_level(log::LevelFilter::Debug)
            .init();

        log::info!("Document explorer starting up");
    } else if verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }
    Ok(())
}
