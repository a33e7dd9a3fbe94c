//! CLI application for controlling Exoy lights.
//!
//! This example demonstrates the public API: connecting to a fixture,
//! reading and writing normalized values, and watching change events.
//!
//! Run with: cargo run --example exoy_cli -- --help

use clap::{Parser, Subcommand};
use exoy_lights_rs::{DeviceIdentity, LightInstance, Property};
use futures::StreamExt;

#[derive(Parser)]
#[command(name = "exoy-cli")]
#[command(about = "Control Exoy light fixtures from the command line", long_about = None)]
struct Cli {
    /// Address (IP or hostname) of the fixture
    #[arg(short = 'H', long)]
    host: String,

    /// Display name used when the device does not report one
    #[arg(short, long, default_value = "Exoy light")]
    name: String,

    /// Hardware identifier, if known
    #[arg(short, long, default_value = "")]
    mac: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current normalized state
    Status,

    /// Turn the light on
    On,

    /// Turn the light off
    Off,

    /// Set brightness (1-100)
    Brightness {
        /// Brightness percent (1-100)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=100))]
        percent: u8,
    },

    /// Set hue in degrees (0-360)
    Hue {
        /// Hue angle in degrees (0-360)
        #[arg(value_parser = clap::value_parser!(u16).range(0..=360))]
        degrees: u16,
    },

    /// Set saturation (1-100)
    Saturation {
        /// Saturation percent (1-100)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=100))]
        percent: u8,
    },

    /// Watch for property changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let identity = DeviceIdentity::new(&cli.host, &cli.name, &cli.mac);
    let light = LightInstance::connect(identity).await?;
    println!("Connected to {}", light.display_name());

    match cli.command {
        Commands::Status => {
            println!("power:      {}", light.get(Property::Power) == 1);
            println!("hue:        {}", light.get(Property::Hue));
            println!("saturation: {}", light.get(Property::Saturation));
            println!("brightness: {}", light.get(Property::Brightness));
            if let Some(info) = light.info() {
                println!("mdns name:  {}", info.mdns_name);
                println!("firmware:   {}", info.firmware_version);
            }
        }
        Commands::On => light.set_power(true).await?,
        Commands::Off => light.set_power(false).await?,
        Commands::Brightness { percent } => light.set_brightness(percent.into()).await?,
        Commands::Hue { degrees } => light.set_hue(degrees.into()).await?,
        Commands::Saturation { percent } => light.set_saturation(percent.into()).await?,
        Commands::Watch => {
            let mut changes = light.subscribe();
            println!("Watching {} (ctrl-c to quit)", light.display_name());
            while let Some(change) = changes.next().await {
                println!("{} -> {}", change.property(), change.value());
            }
        }
    }

    light.stop().await;
    Ok(())
}
