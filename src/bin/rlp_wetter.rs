// rlp_wetter - Sensor exporter for the RLP agrometeorology network
//
// Copyright 2026 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use prometheus_client::registry::Registry;
use reqwest::Client;
use rlp_wetter::client::RlpWetterClient;
use rlp_wetter::http::RequestContext;
use rlp_wetter::integration::{ConfigEntry, EntryError, Integration};
use rlp_wetter::metrics::WeatherMetrics;
use rlp_wetter::setup::SetupError;
use rlp_wetter::stations;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9784);
const DEFAULT_REFRESH_SECS: u64 = 600;
const DEFAULT_TIMEOUT_MILLIS: u64 = 10000;
// TODO: Placeholder endpoint, replace with the measurement URL published by wetter.rlp.de.
const DEFAULT_API_URL: &str = "https://www.wetter.rlp.de/api/agrarmeteorologie/messwerte";

#[derive(Debug, Parser)]
#[clap(name = "rlp_wetter", version = clap::crate_version!())]
struct RlpWetterApplication {
    /// Station ID to fetch measurements for. May be given multiple times, each station is
    /// only configured once.
    #[clap(long, required_unless_present = "list_stations")]
    station: Vec<u32>,

    /// List known stations and their IDs, sorted by name, then exit
    #[clap(long)]
    list_stations: bool,

    /// URL of the station measurement endpoint. The station ID is appended as the `sid`
    /// query parameter.
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Fetch measurements from the API at this interval, in seconds. Must be at least 1.
    #[clap(long, default_value_t = DEFAULT_REFRESH_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    refresh_secs: u64,

    /// Timeout for fetching measurements from the API, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to bind to. By default, rlp_wetter will bind to public address since
    /// the purpose is to expose sensors to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = RlpWetterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if opts.list_stations {
        for s in stations::picker() {
            println!("{:>6}  {}", s.id, s.name);
        }
        return Ok(());
    }

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = RlpWetterClient::new(http_client, &opts.api_url).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize API client", error = %e);
        process::exit(1)
    });

    let refresh = Duration::from_secs(opts.refresh_secs);
    let mut registry = Registry::default();
    let metrics = Arc::new(WeatherMetrics::new(&mut registry));
    let integration = Arc::new(Integration::new(Arc::new(client), refresh, metrics));

    // Validate every station before starting the HTTP server. An ID the API rejects outright
    // is a configuration mistake so we refuse to start, other failures only skip the station.
    let mut configured = 0;
    for sid in &opts.station {
        if !stations::contains(*sid) {
            tracing::warn!(message = "station is not in the station directory", station_id = sid);
        }

        match integration.configure(*sid).await {
            Ok(entry) => {
                configured += 1;
                setup_or_retry(Arc::clone(&integration), entry, refresh).await;
            }
            Err(SetupError::InvalidStationId(sid)) => {
                tracing::error!(message = "invalid station provided", station_id = sid);
                process::exit(1)
            }
            Err(e) => {
                tracing::error!(message = "unable to configure station", station_id = sid, reason = e.key(), error = %e);
            }
        }
    }

    if configured == 0 {
        tracing::error!(message = "no stations could be configured");
        process::exit(1)
    }

    let context = Arc::new(RequestContext::new(registry, Arc::clone(&integration)));
    let app = rlp_wetter::http::app(context);
    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(message = "server started", address = %opts.bind);
    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    integration.unload_all();
    tracing::info!("server shutdown");
    Ok(())
}

/// Set up a configured station. If it isn't ready yet, keep trying on the refresh interval
/// in the background.
async fn setup_or_retry(integration: Arc<Integration>, entry: ConfigEntry, refresh: Duration) {
    let sid = entry.station_id;
    match integration.setup_entry(entry.clone()).await {
        Ok(_) => {}
        Err(EntryError::NotReady(e)) => {
            tracing::warn!(message = "station not ready, retrying setup later", station_id = sid, error = %e);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(refresh);
                let _ = interval.tick().await;

                loop {
                    let _ = interval.tick().await;
                    if !integration.is_configured(sid) {
                        break;
                    }

                    match integration.setup_entry(entry.clone()).await {
                        Ok(_) => break,
                        Err(EntryError::NotReady(e)) => {
                            tracing::warn!(message = "station still not ready", station_id = sid, error = %e);
                        }
                        Err(e) => {
                            tracing::debug!(message = "giving up station setup", station_id = sid, error = %e);
                            break;
                        }
                    }
                }
            });
        }
        Err(e) => {
            tracing::warn!(message = "unable to set up station", station_id = sid, error = %e);
        }
    }
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
