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

//! Validation of a station before it is configured.

use crate::client::{ClientError, RlpWetterClient};
use crate::stations;
use reqwest::StatusCode;
use std::error;
use std::fmt;

/// Reasons a station can't be configured. Each maps to a stable key suitable for form errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    InvalidStationId(u32),
    FetchFailed(u32),
    CannotConnect(u32),
    NoMeasurements(u32),
    AlreadyConfigured(u32),
    Unknown(u32, String),
}

impl SetupError {
    pub fn key(&self) -> &'static str {
        match self {
            Self::InvalidStationId(_) => "invalid_sid",
            Self::FetchFailed(_) => "fetch_failed",
            Self::CannotConnect(_) => "cannot_connect",
            Self::NoMeasurements(_) => "no_measurements",
            Self::AlreadyConfigured(_) => "already_configured",
            Self::Unknown(_, _) => "unknown",
        }
    }

    pub fn station_id(&self) -> u32 {
        match self {
            Self::InvalidStationId(sid)
            | Self::FetchFailed(sid)
            | Self::CannotConnect(sid)
            | Self::NoMeasurements(sid)
            | Self::AlreadyConfigured(sid)
            | Self::Unknown(sid, _) => *sid,
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStationId(sid) => write!(f, "station ID {} was rejected by the API", sid),
            Self::FetchFailed(sid) => write!(f, "the API failed to fetch data for station {}", sid),
            Self::CannotConnect(sid) => write!(f, "unable to connect to the API for station {}", sid),
            Self::NoMeasurements(sid) => write!(f, "no valid measurements returned for station {}", sid),
            Self::AlreadyConfigured(sid) => write!(f, "station {} is already configured", sid),
            Self::Unknown(sid, msg) => write!(f, "unexpected error for station {}: {}", sid, msg),
        }
    }
}

impl error::Error for SetupError {}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupInfo {
    pub title: String,
}

/// Verify that a station returns measurements and resolve its display title.
///
/// Makes a single request and has no other side effects, so it can be called repeatedly.
pub async fn validate(client: &RlpWetterClient, station_id: u32) -> Result<SetupInfo, SetupError> {
    match client.measurements(station_id).await {
        Ok(_) => Ok(SetupInfo {
            title: stations::title_for(station_id),
        }),
        Err(e) => Err(classify(station_id, e)),
    }
}

fn classify(station_id: u32, err: ClientError) -> SetupError {
    match err {
        ClientError::Connect(e) => {
            tracing::error!(message = "connection error while testing station", station_id = station_id, error = %e);
            SetupError::CannotConnect(station_id)
        }
        ClientError::Status(status, _) => {
            tracing::warn!(message = "API error while testing station", station_id = station_id, status = %status);
            from_status(station_id, status)
        }
        ClientError::NoMeasurements(_) => {
            tracing::warn!(message = "no measurements while testing station", station_id = station_id);
            SetupError::NoMeasurements(station_id)
        }
        e => {
            tracing::error!(message = "unexpected error while testing station", station_id = station_id, error = %e);
            SetupError::Unknown(station_id, e.to_string())
        }
    }
}

fn from_status(station_id: u32, status: StatusCode) -> SetupError {
    match status {
        StatusCode::BAD_REQUEST => SetupError::InvalidStationId(station_id),
        StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
            SetupError::FetchFailed(station_id)
        }
        _ => SetupError::CannotConnect(station_id),
    }
}
