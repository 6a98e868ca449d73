//! Time zone listing.

use axum::{Json, extract::State};

use crate::services::timezones::TimeZoneEntry;
use crate::state::AppState;

/// List the host's time zones, sorted by IANA name.
pub async fn timezones(State(state): State<AppState>) -> Json<Vec<TimeZoneEntry>> {
    Json(state.time_zones().entries().to_vec())
}
