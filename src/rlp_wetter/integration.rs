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

//! Setup and teardown of configured stations.

use crate::client::RlpWetterClient;
use crate::coordinator::{Coordinator, UpdateFailed};
use crate::metrics::WeatherMetrics;
use crate::sensor::{SensorState, WeatherSensor};
use crate::setup::{self, SetupError};
use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A station that passed validation and may be set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub station_id: u32,
    pub title: String,
}

#[derive(Debug)]
pub enum EntryError {
    AlreadyLoaded(u32),
    NotReady(UpdateFailed),
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLoaded(sid) => write!(f, "station {} is already set up", sid),
            Self::NotReady(e) => write!(f, "station not ready: {}", e),
        }
    }
}

impl error::Error for EntryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::NotReady(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct LoadedEntry {
    entry: ConfigEntry,
    coordinator: Arc<Coordinator>,
    sensors: Arc<Vec<WeatherSensor>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Registry of configured stations, each with its own coordinator, sensors, and polling task.
#[derive(Debug)]
pub struct Integration {
    client: Arc<RlpWetterClient>,
    update_interval: Duration,
    metrics: Arc<WeatherMetrics>,
    configured: Mutex<BTreeSet<u32>>,
    entries: Mutex<BTreeMap<u32, LoadedEntry>>,
}

impl Integration {
    pub fn new(client: Arc<RlpWetterClient>, update_interval: Duration, metrics: Arc<WeatherMetrics>) -> Self {
        Integration {
            client,
            update_interval,
            metrics,
            configured: Mutex::new(BTreeSet::new()),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Validate a station and produce an entry for it. Each station may only be configured once.
    pub async fn configure(&self, station_id: u32) -> Result<ConfigEntry, SetupError> {
        if self.is_configured(station_id) {
            return Err(SetupError::AlreadyConfigured(station_id));
        }

        let info = setup::validate(&self.client, station_id).await?;
        if !self.configured().insert(station_id) {
            return Err(SetupError::AlreadyConfigured(station_id));
        }

        Ok(ConfigEntry {
            station_id,
            title: info.title,
        })
    }

    /// Refresh a station once, create its sensors, and start polling it.
    ///
    /// If the initial refresh fails the station is not set up and `EntryError::NotReady` is
    /// returned so that the caller may try again later.
    pub async fn setup_entry(&self, entry: ConfigEntry) -> Result<(), EntryError> {
        let sid = entry.station_id;
        if self.is_loaded(sid) {
            return Err(EntryError::AlreadyLoaded(sid));
        }

        let coordinator = Arc::new(Coordinator::new(sid, Arc::clone(&self.client), self.update_interval));
        coordinator.first_refresh().await.map_err(EntryError::NotReady)?;

        let sensors = Arc::new(WeatherSensor::all(&coordinator));
        self.metrics.observe(&coordinator, &sensors);

        let poller = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run().await })
        };

        let listener = {
            let coordinator = Arc::clone(&coordinator);
            let sensors = Arc::clone(&sensors);
            let metrics = Arc::clone(&self.metrics);
            let mut rx = coordinator.subscribe();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    metrics.observe(&coordinator, &sensors);
                }
            })
        };

        let mut entries = self.loaded();
        if entries.contains_key(&sid) {
            coordinator.shutdown();
            poller.abort();
            listener.abort();
            return Err(EntryError::AlreadyLoaded(sid));
        }

        tracing::info!(message = "station set up", station_id = sid, title = %entry.title, sensors = sensors.len());
        entries.insert(
            sid,
            LoadedEntry {
                entry,
                coordinator,
                sensors,
                tasks: vec![poller, listener],
            },
        );

        Ok(())
    }

    /// Stop polling a station and remove it. Returns false if the station wasn't set up.
    ///
    /// The station stays configured and may be set up again.
    pub fn unload_entry(&self, station_id: u32) -> bool {
        let removed = self.loaded().remove(&station_id);
        match removed {
            Some(loaded) => {
                loaded.coordinator.shutdown();
                for t in &loaded.tasks {
                    t.abort();
                }

                self.metrics.clear_station(station_id, &loaded.sensors);
                tracing::info!(message = "station unloaded", station_id = station_id);
                true
            }
            None => false,
        }
    }

    /// Unload every configured station.
    pub fn unload_all(&self) {
        for sid in self.station_ids() {
            self.unload_entry(sid);
        }
    }

    /// Unload a station if needed and forget its configuration so it may be configured again.
    pub fn remove_entry(&self, station_id: u32) -> bool {
        let unloaded = self.unload_entry(station_id);
        let removed = self.configured().remove(&station_id);
        unloaded || removed
    }

    pub fn is_configured(&self, station_id: u32) -> bool {
        self.configured().contains(&station_id)
    }

    pub fn is_loaded(&self, station_id: u32) -> bool {
        self.loaded().contains_key(&station_id)
    }

    pub fn station_ids(&self) -> Vec<u32> {
        self.loaded().keys().copied().collect()
    }

    pub fn coordinator(&self, station_id: u32) -> Option<Arc<Coordinator>> {
        self.loaded()
            .get(&station_id)
            .map(|l| Arc::clone(&l.coordinator))
    }

    fn configured(&self) -> MutexGuard<'_, BTreeSet<u32>> {
        self.configured.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(&self) -> MutexGuard<'_, BTreeMap<u32, LoadedEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of every sensor of every configured station, ordered by station.
    pub fn sensors(&self) -> Vec<SensorState> {
        self.loaded()
            .values()
            .flat_map(|l| l.sensors.iter().map(|s| s.state()))
            .collect()
    }

    /// Current state of every sensor of one station, `None` if the station isn't set up.
    pub fn station_sensors(&self, station_id: u32) -> Option<Vec<SensorState>> {
        self.loaded()
            .get(&station_id)
            .map(|l| l.sensors.iter().map(|s| s.state()).collect())
    }
}
