//! WXT5x0 CLI - Command-line interface
//!
//! Polls a Vaisala WXT510/WXT520 weather transmitter and prints packets,
//! fetches single messages and sends station control commands.

use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use wxt5x0_core::cli::{print_exit_codes, CliResult, ExitCodes};
use wxt5x0_core::config::{config_file, DriverConfig, Protocol};
use wxt5x0_core::core::driver::{Driver, DriverError, PollSettings};
use wxt5x0_core::core::packet::Packet;
use wxt5x0_core::core::protocol::{self, Message, Station};
use wxt5x0_core::core::transport::{self, create_transport};

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// WXT5x0 CLI
#[derive(Parser, Debug)]
#[command(
    name = "wxt5x0",
    version,
    about = "Driver for Vaisala WXT510/WXT520 weather transmitters",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "WXT5X0_CONFIG")]
    config: Option<PathBuf>,

    /// Communication protocol (serial, nmea, sdi12, tcp)
    #[arg(long, global = true)]
    protocol: Option<Protocol>,

    /// Serial port name (e.g., /dev/ttyUSB0, COM3)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Device address
    #[arg(short, long, global = true)]
    address: Option<u32>,

    /// Host of the TCP serial port server
    #[arg(long, global = true)]
    tcp_host: Option<String>,

    /// Port of the TCP serial port server
    #[arg(long, global = true)]
    tcp_port: Option<u16>,

    /// Seconds between polls
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the station and print packets until interrupted
    Poll {
        /// Stop after this many packets
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Fetch the wind message
    Wind,

    /// Fetch the pressure, temperature and humidity message
    Pth,

    /// Fetch the precipitation message
    Precip,

    /// Fetch the supervisor message
    Supervisor,

    /// Fetch the composite message
    Composite,

    /// Query the device address
    Address,

    /// Send a control command
    Control {
        #[command(subcommand)]
        action: ControlAction,
    },

    /// Compute the CRC integrity tag of a message
    Crc {
        /// Message text without terminator
        text: String,
    },

    /// List available serial ports
    ListPorts,

    /// Show driver information
    Info,

    /// Print the exit code table
    ExitCodes,
}

#[derive(Subcommand, Debug)]
enum ControlAction {
    /// Reset the station
    Reset,
    /// Reset the precipitation counters
    PrecipCounterReset,
    /// Reset the precipitation intensity
    PrecipIntensityReset,
    /// Restart measurements
    MeasurementReset,
    /// Switch to automatic mode
    AutomaticMode,
    /// Switch to polled mode
    PolledMode,
    /// Change the device address
    SetAddress {
        /// New address
        address: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match run(&cli).await {
        Ok(result) => result,
        Err(e) => CliResult::error(ExitCodes::ERROR, format!("{:#}", e)),
    };

    match &result {
        CliResult::Success(Some(msg)) if !cli.quiet => println!("{}", msg),
        CliResult::Error(code, msg) => {
            tracing::debug!("exiting with code {}", code);
            eprintln!("Error: {}", msg);
        }
        _ => {}
    }

    result.to_exit_code()
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<CliResult> {
    match &cli.command {
        Commands::ExitCodes => {
            print_exit_codes();
            return Ok(CliResult::success());
        }
        Commands::Crc { text } => return show_crc(cli, text),
        Commands::ListPorts => return list_ports(cli),
        _ => {}
    }

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(result) => return Ok(result),
    };

    match &cli.command {
        Commands::Info => show_info(cli, &config),
        Commands::Poll { count } => poll(cli, &config, *count).await,
        Commands::Wind => message(cli, &config, Message::Wind).await,
        Commands::Pth => message(cli, &config, Message::Pth).await,
        Commands::Precip => message(cli, &config, Message::Precip).await,
        Commands::Supervisor => message(cli, &config, Message::Supervisor).await,
        Commands::Composite => message(cli, &config, Message::Composite).await,
        Commands::Address => address(cli, &config).await,
        Commands::Control { action } => control(&config, action).await,
        Commands::ExitCodes | Commands::Crc { .. } | Commands::ListPorts => {
            Ok(CliResult::success())
        }
    }
}

/// Config file (or defaults) with command-line overrides applied
fn load_config(cli: &Cli) -> Result<DriverConfig, CliResult> {
    let mut config = match &cli.config {
        Some(path) => DriverConfig::load_from(path)?,
        None => DriverConfig::load()?,
    };

    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }
    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud = Some(baud);
    }
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(host) = &cli.tcp_host {
        config.tcp_host = host.clone();
    }
    if let Some(port) = cli.tcp_port {
        config.tcp_port = port;
    }
    if let Some(interval) = cli.poll_interval {
        config.poll_interval = interval;
    }

    tracing::debug!("config: {:?}", config);
    Ok(config)
}

async fn open_station(config: &DriverConfig) -> Result<Station, DriverError> {
    let transport = create_transport(config.transport())?;
    let mut station = Station::new(transport, config.address);
    station.open().await.map_err(DriverError::Connection)?;
    Ok(station)
}

async fn poll(cli: &Cli, config: &DriverConfig, count: Option<usize>) -> anyhow::Result<CliResult> {
    let mut driver = match Driver::connect(config).await {
        Ok(driver) => driver,
        Err(e) => return Ok(CliResult::from(e)),
    };
    tracing::info!(
        "polling {} every {:?}",
        driver.hardware_name(),
        PollSettings::from(config).poll_interval
    );

    let result = {
        let packets = driver.packets();
        futures::pin_mut!(packets);
        let mut received = 0usize;

        loop {
            if count.is_some_and(|n| received >= n) {
                break CliResult::success();
            }

            tokio::select! {
                next = packets.next() => match next {
                    Some(Ok(packet)) => {
                        print_packet(cli, &packet)?;
                        received += 1;
                    }
                    Some(Err(e)) => break CliResult::from(e),
                    None => break CliResult::success(),
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted");
                    break CliResult::cancelled();
                }
            }
        }
    };

    if let Err(e) = driver.close().await {
        tracing::warn!("close failed: {}", e);
    }

    Ok(result)
}

fn print_packet(cli: &Cli, packet: &Packet) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(packet)?),
        OutputFormat::Text => {
            let time = chrono::DateTime::from_timestamp(packet.timestamp, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| packet.timestamp.to_string());
            let fields: Vec<String> = packet
                .fields
                .iter()
                .map(|(name, value)| match value {
                    Some(v) => format!("{}={}", name, v),
                    None => format!("{}=-", name),
                })
                .collect();
            println!("{} {}", time, fields.join(" "));
        }
    }
    Ok(())
}

async fn message(cli: &Cli, config: &DriverConfig, message: Message) -> anyhow::Result<CliResult> {
    let mut station = match open_station(config).await {
        Ok(station) => station,
        Err(e) => return Ok(CliResult::from(e)),
    };

    let raw = station.get_message(message).await;
    if let Err(e) = station.close().await {
        tracing::warn!("close failed: {}", e);
    }
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => return Ok(CliResult::from(DriverError::from(e))),
    };

    let data = protocol::parse(&raw);
    let line = String::from_utf8_lossy(&raw);
    let line = line.trim_end();

    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "message": format!("{:?}", message),
                "raw": line,
                "data": data,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", line);
            if !cli.quiet {
                for (name, value) in &data {
                    match value {
                        Some(v) => println!("  {:<22} {}", name, v),
                        None => println!("  {:<22} -", name),
                    }
                }
            }
        }
    }

    Ok(CliResult::success())
}

async fn address(cli: &Cli, config: &DriverConfig) -> anyhow::Result<CliResult> {
    let mut station = match open_station(config).await {
        Ok(station) => station,
        Err(e) => return Ok(CliResult::from(e)),
    };

    let reply = station.get_address().await;
    if let Err(e) = station.close().await {
        tracing::warn!("close failed: {}", e);
    }

    match reply {
        Ok(reply) => {
            let reply = String::from_utf8_lossy(&reply).trim().to_string();
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "address": reply }));
                }
                OutputFormat::Text => println!("{}", reply),
            }
            Ok(CliResult::success())
        }
        Err(e) => Ok(CliResult::from(DriverError::from(e))),
    }
}

async fn control(config: &DriverConfig, action: &ControlAction) -> anyhow::Result<CliResult> {
    let mut station = match open_station(config).await {
        Ok(station) => station,
        Err(e) => return Ok(CliResult::from(e)),
    };

    let sent = match action {
        ControlAction::Reset => station.reset().await,
        ControlAction::PrecipCounterReset => station.precip_counter_reset().await,
        ControlAction::PrecipIntensityReset => station.precip_intensity_reset().await,
        ControlAction::MeasurementReset => station.measurement_reset().await,
        ControlAction::AutomaticMode => station.set_automatic_mode().await,
        ControlAction::PolledMode => station.set_polled_mode().await,
        ControlAction::SetAddress { address } => station.set_address(*address).await,
    };
    if let Err(e) = station.close().await {
        tracing::warn!("close failed: {}", e);
    }

    match sent {
        Ok(()) => Ok(CliResult::success_with_message(format!(
            "Sent {:?} to address {}",
            action,
            station.address()
        ))),
        Err(e) => Ok(CliResult::from(DriverError::from(e))),
    }
}

fn show_crc(cli: &Cli, text: &str) -> anyhow::Result<CliResult> {
    let crc = protocol::crc16(text.as_bytes());
    let tag = protocol::crc_tag(text.as_bytes());
    let tag = String::from_utf8_lossy(&tag);

    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "text": text,
                "crc": format!("{:04X}", crc),
                "tag": tag,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => println!("{}{}  (CRC {:04X})", text, tag, crc),
    }

    Ok(CliResult::success())
}

fn list_ports(cli: &Cli) -> anyhow::Result<CliResult> {
    let ports = match transport::list_ports() {
        Ok(ports) => ports,
        Err(e) => return Ok(CliResult::from(DriverError::from(e))),
    };

    if ports.is_empty() {
        if !cli.quiet {
            println!("No serial ports found.");
        }
        return Ok(CliResult::success());
    }

    match cli.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = ports
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.port_name,
                        "type": format!("{:?}", p.port_type)
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for port in &ports {
                println!("{}", port.port_name);
            }
        }
    }

    Ok(CliResult::success())
}

fn show_info(cli: &Cli, config: &DriverConfig) -> anyhow::Result<CliResult> {
    let connection = config.transport();
    let info = serde_json::json!({
        "version": wxt5x0_core::VERSION,
        "model": config.model,
        "protocol": config.protocol.name(),
        "connection": format!("{:?}", connection),
        "address": config.address,
        "config_file": config_file(),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH
    });

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        OutputFormat::Text => {
            println!("WXT5x0 driver v{}", wxt5x0_core::VERSION);
            println!("Platform: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
            println!();
            println!("Model:    {}", config.model);
            println!("Protocol: {}", config.protocol);
            println!("Address:  {}", config.address);
            match config.protocol {
                Protocol::Tcp => println!("Server:   {}:{}", config.tcp_host, config.tcp_port),
                _ => println!("Port:     {} @ {} baud", config.port, config.baud_rate()),
            }
            if let Some(path) = config_file() {
                println!("Config:   {}", path.display());
            }
        }
    }

    Ok(CliResult::success())
}
