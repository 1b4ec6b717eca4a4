use clap::Parser;
use daemon_common::{LogLevel, init_tracing, maybe_daemonize};
use eunoia::{Cli, Command, shutdown_signal};
use tracing::info;

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.clone() {
        Some(Command::FetchModel {
            model,
            dir,
            base_url,
        }) => {
            init_tracing(cli.overrides.log_level.unwrap_or(LogLevel::Info))?;
            let path = runtime()?.block_on(eunoia::stt::fetch_model(&model, &dir, &base_url))?;
            println!("{}", path.display());
            Ok(())
        }
        Some(Command::Serve) | None => {
            let settings = cli.settings()?;
            // fork before any runtime threads exist
            maybe_daemonize(settings.daemon)?;
            init_tracing(settings.log_level)?;
            info!(host = %settings.host, port = settings.port, "starting eunoia");
            runtime()?.block_on(eunoia::runtime::run(settings, shutdown_signal()))
        }
    }
}
