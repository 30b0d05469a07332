use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::telemetry::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "tpt-console",
    about = "Live monitoring console for a TPT multi-channel test controller behind a MES backend",
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "TPT_CONSOLE_SERVER",
        default_value = "http://127.0.0.1:8080",
        help = "Base URL of the MES backend"
    )]
    pub server: String,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "TPT_CONSOLE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "TPT_CONSOLE_LOG_FILE",
        help = "Write structured logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch live channel state in the terminal (default when no subcommand given)
    Watch,
    /// Send a single control command and exit
    #[command(subcommand)]
    Cmd(CmdKind),
}

#[derive(Subcommand, Debug)]
pub enum CmdKind {
    /// Start a test run on one channel
    Start {
        #[arg(long, value_name = "CHANNEL", help = "Target channel id, e.g. CH001")]
        channel: String,
        #[arg(long, value_name = "BARCODE")]
        barcode: String,
        #[arg(long, value_name = "PROCESS")]
        process: String,
        #[arg(long = "data-path", value_name = "PATH")]
        data_path: String,
    },
    /// Stop the run on one channel
    Stop {
        #[arg(long, value_name = "CHANNEL")]
        channel: String,
    },
    /// Pause the run on one channel
    Pause {
        #[arg(long, value_name = "CHANNEL")]
        channel: String,
    },
    /// Resume a paused run on one channel
    Resume {
        #[arg(long, value_name = "CHANNEL")]
        channel: String,
    },
    /// Ask the controller to report the status of every channel
    RspStatus,
    /// Send a custom command by protocol type tag
    Custom {
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_mode() {
        let cli = Cli::try_parse_from(["tpt-console"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.server, "http://127.0.0.1:8080");
    }

    #[test]
    fn parses_start_command() {
        let cli = Cli::try_parse_from([
            "tpt-console",
            "cmd",
            "start",
            "--channel",
            "CH001",
            "--barcode",
            "B1",
            "--process",
            "aging",
            "--data-path",
            "D:/data",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Cmd(CmdKind::Start { channel, .. })) => assert_eq!(channel, "CH001"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
