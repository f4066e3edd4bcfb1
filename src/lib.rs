pub mod cli;
pub mod config;
pub mod history;
pub mod serial;
pub mod session;
pub mod telemetry;

use clap::Parser;

pub fn run() -> anyhow::Result<()> {
  let cli = cli::Cli::parse();
  cli::init_logging(cli.verbose);

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()?;

  log::debug!("Thrust stand logger started");
  runtime.block_on(cli::dispatch(cli))
}
