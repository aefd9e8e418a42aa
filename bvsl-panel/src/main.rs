//! BetterVSL Panel - Main Entry Point
//!
//! Connects to the host extension and drives it from a line-oriented console.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bvsl_bridge::{BridgeSettings, HostChannel};
use bvsl_panel::console::{self, Input, HELP};
use bvsl_panel::{Message, Panel};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application startup flags
#[derive(Debug, Clone, Default)]
struct Flags {
    /// Path to bridge settings file (optional)
    config_path: Option<PathBuf>,
}

impl Flags {
    fn from_args() -> Self {
        Self {
            config_path: std::env::args_os().nth(1).map(PathBuf::from),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let flags = Flags::from_args();
    let settings = match flags.config_path.or_else(BridgeSettings::default_path) {
        Some(path) => BridgeSettings::load_or_create(&path)
            .with_context(|| format!("loading bridge settings from {}", path.display()))?,
        None => BridgeSettings::default(),
    };

    let (channel, mut rejections) = HostChannel::connect(&settings)
        .await
        .with_context(|| format!("connecting to host at {}", settings.address))?;
    let mut panel = Panel::new(Arc::new(channel));

    println!("{}", console::render(&panel));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let message = tokio::select! {
            Some(message) = panel.next_event() => message,
            Some(rejection) = rejections.recv() => Message::RemoteRejected(rejection.message),
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Input>() {
                    Ok(Input::Panel(message)) => message,
                    Ok(Input::Show) => {
                        println!("{}", console::render(&panel));
                        continue;
                    }
                    Ok(Input::Dump) => {
                        println!("{}", serde_json::to_string_pretty(panel.config())?);
                        continue;
                    }
                    Ok(Input::Help) => {
                        println!("{}", HELP);
                        continue;
                    }
                    Ok(Input::Quit) => break,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                }
            }
        };

        let echo = !matches!(message, Message::StatusReceived { .. });
        panel.update(message);
        if echo {
            println!("{}", console::render(&panel));
        }
    }

    if panel.is_logging() {
        info!("Stopping capture before exit");
        panel.stop_logging().context("stopping capture")?;
    }
    panel.dispose();
    Ok(())
}
