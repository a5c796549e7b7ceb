#![forbid(unsafe_code)]

mod classifier;
mod cli;
mod config;
mod constants;
mod daemon;
mod engine;
mod host;
mod ipc;
mod persistence;
mod types;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command, SetArgs};
use config::{Configuration, SettingsBundle};
use daemon::DaemonOptions;
use engine::StatusReport;
use ipc::{ControlClient, ControlRequest, ControlResponse};
use types::{HighlightTarget, SettingField};

/// Send one request to the daemon; daemon-side errors become `Err`
fn send(socket: &Path, request: ControlRequest) -> Result<ControlResponse> {
    let mut client = ControlClient::connect_to(socket)?;
    match client.request(&request)? {
        ControlResponse::Error(message) => bail!("Daemon error: {message}"),
        response => Ok(response),
    }
}

fn fetch_status(socket: &Path) -> Result<StatusReport> {
    match send(socket, ControlRequest::Status)? {
        ControlResponse::Status(report) => Ok(report),
        other => bail!("Unexpected response: {other:?}"),
    }
}

fn print_updated(response: ControlResponse, what: &str) -> Result<()> {
    match response {
        ControlResponse::Updated { changed: true } => println!("{what} updated"),
        ControlResponse::Updated { changed: false } => println!("{what} unchanged"),
        other => bail!("Unexpected response: {other:?}"),
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn print_status(report: &StatusReport) {
    println!("Enabled:         {}", yes_no(report.enabled));
    println!("Category:        {}", report.category.label());
    println!("Active profile:  {}", report.active_profile.label());
    println!("In duty:         {}", yes_no(report.in_duty));
    println!("Alliance zone:   {}", yes_no(report.alliance_like_zone));
    println!("Live settings:");
    for (field, value) in &report.live.values {
        match value {
            Some(value) => println!("  {:<28} {}", field.key(), value),
            None => println!("  {:<28} (unreadable)", field.key()),
        }
    }
}

fn print_bundle(bundle: &SettingsBundle) {
    println!("{}", bundle.category.label());
    for field in SettingField::ALL {
        println!("  {:<28} {}", field.key(), bundle.get(field));
    }
    for target in HighlightTarget::ALL {
        println!("  {:<28} {:?}", format!("Highlight{target:?}"), bundle.highlight(target));
    }
    println!("  {:<28} {}", "OnlyInDuty", yes_no(bundle.only_in_duty));
}

fn edit_profile(socket: &Path, args: &SetArgs) -> Result<()> {
    let patch = args.patch();
    if patch.is_empty() && !args.apply {
        bail!("Nothing to change, pass at least one setting flag or --apply");
    }

    // edits to the governing profile go live right away
    let active = args.apply || fetch_status(socket)?.active_profile == args.category;

    let response = send(
        socket,
        ControlRequest::UpdateProfile {
            category: args.category,
            patch,
            active,
        },
    )?;
    print_updated(response, "Profile")
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let socket = match cli.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };

    match cli.command {
        Command::Run {
            config,
            host_state,
            zones,
            tick_ms,
        } => daemon::run(DaemonOptions {
            config_path: config.unwrap_or_else(Configuration::path),
            host_state_path: host_state,
            zones_path: zones,
            socket_path: socket,
            tick: Duration::from_millis(tick_ms),
        }),
        Command::Status => {
            print_status(&fetch_status(&socket)?);
            Ok(())
        }
        Command::Enable => {
            print_updated(send(&socket, ControlRequest::SetEnabled(true))?, "Master enable")
        }
        Command::Disable => {
            print_updated(send(&socket, ControlRequest::SetEnabled(false))?, "Master enable")
        }
        Command::ToggleWindow => match send(&socket, ControlRequest::ToggleVisible)? {
            ControlResponse::Visible(visible) => {
                println!("Settings window {}", if visible { "shown" } else { "hidden" });
                Ok(())
            }
            other => bail!("Unexpected response: {other:?}"),
        },
        Command::Show { category } => match send(&socket, ControlRequest::GetConfig)? {
            ControlResponse::Config(config) => {
                print_bundle(config.profiles.get(category));
                Ok(())
            }
            other => bail!("Unexpected response: {other:?}"),
        },
        Command::Set(args) => edit_profile(&socket, &args),
        Command::Debug(args) => {
            let patch = args.patch();
            if patch == config::DebugPatch::default() {
                match send(&socket, ControlRequest::GetConfig)? {
                    ControlResponse::Config(config) => {
                        println!("{:#?}", config.debug);
                        Ok(())
                    }
                    other => bail!("Unexpected response: {other:?}"),
                }
            } else {
                print_updated(send(&socket, ControlRequest::UpdateDebug(patch))?, "Debug overrides")
            }
        }
    }
}
