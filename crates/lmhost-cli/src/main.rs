//! CLI entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use lmhost_cli::handlers::generate::GenerateArgs;
use lmhost_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_args(cli.port, cli.data_dir)?;
    let ctx = bootstrap(config);

    match command {
        Commands::Status => handlers::status::execute(&ctx).await?,
        Commands::List => handlers::list::execute(&ctx)?,
        Commands::Install { model } => handlers::install::execute(&ctx, &model).await?,
        Commands::Generate {
            prompt,
            model,
            stream,
            max_tokens,
            temperature,
        } => {
            let args = GenerateArgs {
                prompt,
                model,
                stream,
                max_tokens,
                temperature,
            };
            handlers::generate::execute(&ctx, args).await?;
        }
        Commands::Serve => handlers::serve::execute(&ctx).await?,
        Commands::Paths => handlers::paths::execute(&ctx)?,
    }

    Ok(())
}
