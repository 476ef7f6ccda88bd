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

use crate::integration::Integration;
use crate::sensor::SensorState;
use crate::stations::{self, Station};
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const OPENMETRICS_TEXT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct RequestContext {
    registry: Registry,
    integration: Arc<Integration>,
}

impl RequestContext {
    pub fn new(registry: Registry, integration: Arc<Integration>) -> Self {
        Self { registry, integration }
    }
}

/// Routes for metrics, sensor state, and the station directory.
pub fn app(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .route("/sensors", get(all_sensors))
        .route("/sensors/:station_id", get(station_sensors))
        .route("/stations", get(station_list))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();
    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPENMETRICS_TEXT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn all_sensors(State(context): State<Arc<RequestContext>>) -> Json<Vec<SensorState>> {
    Json(context.integration.sensors())
}

async fn station_sensors(
    State(context): State<Arc<RequestContext>>,
    Path(station_id): Path<u32>,
) -> Result<Json<Vec<SensorState>>, StatusCode> {
    context
        .integration
        .station_sensors(station_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn station_list() -> Json<Vec<&'static Station>> {
    Json(stations::picker())
}
