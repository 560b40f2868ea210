// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Headless console monitor for live APRS report feeds.
//!
//! Connects to a report feed, maintains the bounded message view through
//! `aprs-client`, and prints messages, markers and alerts to the terminal.

mod config;
mod console;

use clap::Parser;
use log::{info, warn};

use aprs_client::{ConnectionConfig, Engine, EngineConfig, FilterCriteria, StoreEvent};
use config::AppConfig;
use console::{ConsoleAlerts, LogMarkers, TerminalBell};

#[derive(Parser, Debug)]
#[command(name = "aprsview", about = "Console monitor for live APRS report feeds")]
struct Args {
    /// Feed endpoint (overrides the configured one)
    #[arg(long)]
    endpoint: Option<String>,

    /// Callsign to alert on; may be repeated (overrides the configured list)
    #[arg(long = "watch")]
    watch: Vec<String>,

    /// Maximum number of retained messages
    #[arg(long)]
    max_messages: Option<usize>,

    /// Only show messages whose sender matches this substring
    #[arg(long)]
    from: Option<String>,

    /// Only show messages whose recipient matches this substring
    #[arg(long)]
    to: Option<String>,

    /// Only show messages whose payload matches this substring
    #[arg(long)]
    data: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        info!("Config file: {}", path.display());
    }

    let endpoint = args.endpoint.unwrap_or(config.endpoint);
    let watch_list = if args.watch.is_empty() {
        config.watch_list
    } else {
        args.watch
    };

    let mut engine = Engine::new(
        EngineConfig {
            connection: ConnectionConfig {
                url: endpoint,
                ..ConnectionConfig::default()
            },
            max_messages: args.max_messages.unwrap_or(config.max_messages),
            watch_list,
        },
        Box::new(LogMarkers),
        Box::new(ConsoleAlerts),
        Box::new(TerminalBell),
    );

    engine.set_criteria(FilterCriteria {
        from: args.from.unwrap_or_default(),
        to: args.to.unwrap_or_default(),
        data: args.data.unwrap_or_default(),
    });

    // Running in a terminal counts as the user's gesture; unlock sound now
    // so watch-list alerts can ring the bell.
    engine.request_unlock().await;

    let mut store_events = engine.subscribe_store();
    engine.connect();

    loop {
        tokio::select! {
            more = engine.process_next() => {
                if !more {
                    break;
                }
                while let Ok(event) = store_events.try_recv() {
                    if let StoreEvent::Inserted(id) = event {
                        print_message(&engine, id);
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down");
                engine.shutdown();
                break;
            }
        }
    }
}

fn print_message(engine: &Engine, id: aprs_client::MessageId) {
    let Some(message) = engine.message(id) else {
        return;
    };
    if !engine.visibility().message_visible(id) {
        return;
    }

    let report = &message.report;
    let timestamp = message.received_at.format("%H:%M:%S");
    let to = report.to.as_deref().unwrap_or("-");
    let via = report.via.as_deref().filter(|v| !v.is_empty());
    let data = report.data.as_deref().unwrap_or("");

    match via {
        Some(via) => info!(
            "[{timestamp}] {} > {to} via {via}: {data}",
            report.from
        ),
        None => info!("[{timestamp}] {} > {to}: {data}", report.from),
    }
}
