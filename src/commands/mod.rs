use clap::Parser;
use log::LevelFilter;

use crate::logging;
use crate::utils::normalize_addr;

mod serve;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "HTTP endpoint that appends structured log events to one file per day.", long_about = None, disable_help_subcommand = true)]
pub struct Logd {
    #[arg(
        short,
        long,
        help = "Address or bare port to listen on. Defaults to the PORT environment variable, then 0.0.0.0:8080.",
        display_order = 0
    )]
    pub listen: Option<String>,

    #[arg(
        short = 'd',
        long,
        help = "Directory the per-day log files are written to. Defaults to the LOG_DIR environment variable, then ./logs.",
        display_order = 0
    )]
    pub log_dir: Option<String>,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        help = "Write more verbose messages to stderr.",
        display_order = 999
    )]
    pub verbose: u8,
}

impl Logd {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            2_u8..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn setup_logging(&self) -> eyre::Result<()> {
        logging::Builder::new()
            .with_level(self.log_filter())
            .with_stderr_sink()
            .build()
            .init()
    }

    pub fn run(self) -> eyre::Result<()> {
        self.setup_logging()?;

        let listen = self
            .listen
            .clone()
            .or_else(|| std::env::var("PORT").ok())
            .unwrap_or_default();
        let listen = normalize_addr(&listen, DEFAULT_LISTEN);

        let log_dir = self
            .log_dir
            .clone()
            .or_else(|| std::env::var("LOG_DIR").ok())
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        log::info!(target: "logd", "logd starting up, listening on {} writing to {}", listen, log_dir);
        log::trace!(target: "logd", "log level: {}", self.log_filter());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let result = runtime.block_on(serve::run(&listen, &log_dir));

        if let Err(msg) = &result {
            log::error!(target: "logd", "server failed, error={} cause={}", msg, msg.root_cause());
        }

        result
    }
}
