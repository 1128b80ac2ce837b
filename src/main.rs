use bookhaven::cli::{Cli, Commands};
use bookhaven::config::{get_config, init_config_from};
use bookhaven::runtime::modes;
use bookhaven::system::init_logging;
use clap::Parser;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    match cli.command {
        None | Some(Commands::Serve) => {
            let config = get_config();
            let _guard = init_logging(&config.logging);
            modes::run_server().await
        }
        Some(command) => {
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
