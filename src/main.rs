use clap::Parser;
use contactd::cli::{run_migrate, Cli, Commands};
use contactd::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        None => server::serve(cli.serve.into_config()?).await?,
        Some(Commands::Serve(args)) => server::serve(args.into_config()?).await?,
        Some(Commands::Migrate(args)) => run_migrate(&args)?,
    }

    Ok(())
}
