use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{Settings, SettingsOverrides, SETTINGS_FILE_NAME};
use crate::history::{self, ExportMetadata, LoadedHistory};
use crate::serial::{self, SerialInterface};
use crate::session::{poll_until, AcquisitionSession};
use crate::telemetry::{Sample, SampleBuffer, TelemetryReader};

#[derive(Debug, Parser)]
#[command(name = "thrust-stand", version, about = "Record and review motor thrust stand tests")]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    pub config: PathBuf,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available serial ports
    Ports,
    /// Run a test: connect, record until stopped, export to CSV
    Record(RecordArgs),
    /// Send the stop command to the motor controller
    StopMotor {
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Browse saved tests
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[arg(short, long)]
    pub port: Option<String>,

    #[arg(long)]
    pub baud_rate: Option<u32>,

    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(short, long)]
    pub duration: Option<f64>,

    #[arg(long)]
    pub motor: Option<String>,

    #[arg(long)]
    pub propeller: Option<String>,

    /// Export path (default: thrust_test_<date>.csv in the history directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Start the automated throttle ramp once connected
    #[arg(long)]
    pub procedure: bool,

    /// Print every sample as it arrives
    #[arg(long)]
    pub live: bool,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List saved tests, newest first
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the samples of a saved test
    Show {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    match cli.command {
        Command::Ports => list_ports(),
        Command::Record(args) => record(settings, args).await,
        Command::StopMotor { port } => stop_motor(settings, port).await,
        Command::History(HistoryCommand::List { dir }) => {
            list_history(dir.as_deref().unwrap_or(&settings.history_dir))
        }
        Command::History(HistoryCommand::Show { file, json }) => show_history(&file, json),
    }
}

fn list_ports() -> Result<()> {
    let ports = serial::list_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No ports available");
    }
    for port in ports {
        match port.description {
            Some(description) => println!("{}  ({})", port.port_name, description),
            None => println!("{}", port.port_name),
        }
    }
    Ok(())
}

async fn connect(settings: &Settings) -> Result<TelemetryReader> {
    let port = settings
        .port
        .clone()
        .context("No port specified; pass --port or set `port` in the settings file")?;
    let interface = SerialInterface::new()
        .with_baud_rate(settings.baud_rate)
        .with_settle_delay(settings.settle_delay());
    let mut reader = TelemetryReader::new(interface, SampleBuffer::new(settings.buffer_capacity));

    log::info!("Connecting to {} (waiting for the board to reset)", port);
    let reader = tokio::task::spawn_blocking(move || reader.connect(&port).map(|()| reader))
        .await
        .context("Connection task failed")??;
    Ok(reader)
}

async fn stop_motor(mut settings: Settings, port: Option<String>) -> Result<()> {
    settings.apply_overrides(SettingsOverrides { port, ..Default::default() });
    let mut reader = connect(&settings).await?;
    reader.stop_motor();
    reader.disconnect();
    println!("Motor stop sent");
    Ok(())
}

async fn record(mut settings: Settings, args: RecordArgs) -> Result<()> {
    let RecordArgs { port, baud_rate, duration, motor, propeller, output, procedure, live } = args;
    settings.apply_overrides(SettingsOverrides { port, baud_rate, history_dir: None, motor, propeller });
    settings.validate()?;
    let duration = run_length(duration)?;

    let mut reader = connect(&settings).await?;
    if procedure {
        reader.run_procedure();
    }

    let mut session = AcquisitionSession::new();
    session.start();

    let interrupted = Cell::new(false);
    let stop = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            interrupted.set(true);
        };
        match duration {
            Some(length) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = tokio::time::sleep(length) => {}
                }
            }
            None => ctrl_c.await,
        }
    };

    println!("Recording; press Ctrl-C to stop");
    poll_until(&mut session, &mut reader, settings.poll_interval(), stop, |sample| {
        if live {
            println!("{}", sample.readout());
        }
    })
    .await;

    session.stop();
    if interrupted.get() {
        reader.stop_motor();
    }
    let stats = reader.stats().clone();
    reader.disconnect();
    log::debug!("Reader stats: {:?}", stats);

    println!("{}", session.summary());
    if session.history().is_empty() {
        log::warn!("No data recorded; nothing exported");
        return Ok(());
    }

    let metadata = ExportMetadata {
        motor: settings.motor.clone(),
        propeller: settings.propeller.clone(),
        exported: None,
    };
    let now = chrono::Local::now().naive_local();
    let path = save_run(
        output.as_deref(),
        &settings.history_dir,
        &std::env::temp_dir(),
        now,
        &metadata,
        session.history(),
    )?;
    println!("Data exported to: {}", path.display());
    Ok(())
}

/// `--duration` as a run length, rejecting negative or unrepresentable values.
fn run_length(secs: Option<f64>) -> Result<Option<Duration>> {
    secs.map(|s| Duration::try_from_secs_f64(s).with_context(|| format!("Invalid duration: {} s", s)))
        .transpose()
}

/// Export a finished run. An explicit `output` is written as given; otherwise
/// a fresh name in `history_dir` is used. If that fails the run is saved
/// under a fresh name in `fallback_dir` instead of being lost.
fn save_run(
    output: Option<&Path>,
    history_dir: &Path,
    fallback_dir: &Path,
    now: chrono::NaiveDateTime,
    metadata: &ExportMetadata,
    samples: &[Sample],
) -> Result<PathBuf> {
    let primary = match output {
        Some(path) => history::export_history(path, Some(metadata), samples).map(|()| path.to_path_buf()),
        None => history::export_new_history(history_dir, now, Some(metadata), samples),
    };
    let error = match primary {
        Ok(path) => return Ok(path),
        Err(e) => e,
    };

    let target = output.map_or_else(|| history_dir.display().to_string(), |p| p.display().to_string());
    log::error!("Failed to export data to {}: {}", target, error);
    let path = history::export_new_history(fallback_dir, now, Some(metadata), samples).with_context(|| {
        format!("Failed to export data to {} ({}); saving to {} failed too", target, error, fallback_dir.display())
    })?;
    eprintln!("Could not write {} ({}); saved the run to the fallback location instead", target, error);
    Ok(path)
}

fn list_history(dir: &Path) -> Result<()> {
    let files = history::discover_history_files(dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    if files.is_empty() {
        println!("No saved tests in {}", dir.display());
    }
    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}

fn show_history(file: &Path, json: bool) -> Result<()> {
    let loaded = history::load_history_file(file)
        .with_context(|| format!("History load error for {}", file.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&loaded)?);
    } else {
        print!("{}", render_table(&loaded));
    }
    Ok(())
}

pub fn render_table(loaded: &LoadedHistory) -> String {
    let mut out = String::new();
    if let Some(motor) = loaded.motor.as_deref().filter(|m| !m.is_empty()) {
        out.push_str(&format!("Motor: {}\n", motor));
    }
    if let Some(propeller) = loaded.propeller.as_deref().filter(|p| !p.is_empty()) {
        out.push_str(&format!("Propeller: {}\n", propeller));
    }
    out.push_str(&format!(
        "{:>10} {:>11} {:>8} {:>17} {:>12} {:>12} {:>10}\n",
        "Time (s)", "Thrust (g)", "RPM", "Temperature (°C)", "Voltage (V)", "Current (A)", "Power (W)"
    ));
    for s in &loaded.samples {
        out.push_str(&format!(
            "{:>10.3} {:>11.3} {:>8.1} {:>17.2} {:>12.3} {:>12.3} {:>10.3}\n",
            s.elapsed_time,
            s.thrust,
            s.rpm,
            s.temperature,
            s.voltage,
            s.current,
            s.resolved_power(),
        ));
    }
    out
}
