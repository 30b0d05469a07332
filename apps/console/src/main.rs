use anyhow::{Context, Result};
use url::Url;

use tpt_console::cli::{self, CmdKind, Command};
use tpt_console::client::commands::CommandClient;
use tpt_console::config::Config;
use tpt_console::{app, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();
    telemetry::init(&cli.logging.to_config())?;

    let server: Url = cli
        .server
        .parse()
        .with_context(|| format!("invalid server URL {:?}", cli.server))?;
    let config = Config::from_env(server);

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => app::run(config).await,
        Command::Cmd(kind) => run_command(&config, kind).await,
    }
}

async fn run_command(config: &Config, kind: CmdKind) -> Result<()> {
    let client = CommandClient::new(config.server_base.clone());
    let result = match kind {
        CmdKind::Start {
            channel,
            barcode,
            process,
            data_path,
        } => client
            .start(&channel, &barcode, &process, &data_path)
            .await
            .map(|()| format!("START sent to {channel}")),
        CmdKind::Stop { channel } => client
            .stop(&channel)
            .await
            .map(|()| format!("STOP sent to {channel}")),
        CmdKind::Pause { channel } => client
            .pause(&channel)
            .await
            .map(|()| format!("PAUSE sent to {channel}")),
        CmdKind::Resume { channel } => client
            .resume(&channel)
            .await
            .map(|()| format!("RESUME sent to {channel}")),
        CmdKind::RspStatus => client
            .request_status()
            .await
            .map(|()| "RSP_STATUS sent".to_owned()),
        CmdKind::Custom { kind } => client
            .custom(&kind)
            .await
            .map(|()| format!("custom command sent (type: {kind})")),
    };

    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
