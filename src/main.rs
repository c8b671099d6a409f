use clap::Parser;
use tasktree::cli::commands::Cli;
use tasktree::cli::handlers;
use tasktree::io::config_io;

fn main() {
    let cli = Cli::parse();

    let config = match config_io::read_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    tasktree::logging::init(&config.log.level);

    if let Err(e) = handlers::dispatch(cli, config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
