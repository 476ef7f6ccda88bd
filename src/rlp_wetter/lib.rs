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

//! Sensor exporter for the Rhineland-Palatinate agrometeorology weather station network
//!
//! ## Features
//!
//! `rlp_wetter` polls the measurement API of the [RLP agrometeorology] network for one or more
//! stations and exposes the most recent measurement of each station as a set of sensors. Sensor
//! state is available as JSON and as Prometheus metrics.
//!
//! Every station is validated before it is set up: the API must answer with at least one
//! measurement for it. After that, each station is refreshed on a fixed interval. A failed
//! refresh never discards the last good measurement, it is retried on the next interval.
//!
//! The following endpoints are served:
//!
//! * `/metrics` - Prometheus metrics in the OpenMetrics text format.
//! * `/sensors` - JSON state of all sensors of all stations.
//! * `/sensors/$STATION_ID` - JSON state of all sensors of one station.
//! * `/stations` - Directory of known stations, sorted by name.
//!
//! The following metrics are emitted when available:
//!
//! * `rlp_wetter_station{station_id=$ID, station_name=$NAME, station_height=$HEIGHT}` - Station metadata.
//! * `rlp_wetter_last_update_success{station_id=$ID}` - 1 if the last update succeeded, 0 otherwise.
//! * `rlp_wetter_last_update_timestamp_seconds{station_id=$ID}` - Time of the last successful update.
//! * `rlp_wetter_sensor{station_id=$ID, sensor=$KEY, unit=$UNIT}` - Latest numeric value of a sensor.
//!
//! [RLP agrometeorology]: https://www.wetter.rlp.de/Agrarmeteorologie
//!
//! ## Usage
//!
//! List the known stations and pick one or more IDs.
//!
//! ```text
//! ./rlp_wetter --list-stations
//! ```
//!
//! Then run `rlp_wetter` for those stations.
//!
//! ```text
//! ./rlp_wetter --station 102 --station 171
//! ```
//!
//! Metrics are exposed on port `9784` at `/metrics`.
//!

pub mod client;
pub mod coordinator;
pub mod http;
pub mod integration;
pub mod metrics;
pub mod sensor;
pub mod setup;
pub mod stations;
