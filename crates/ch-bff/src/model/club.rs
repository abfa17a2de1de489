//! Club and court records from the identity and courts services.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::time::TimeOfDay;

/// Club profile as served by the identity/profile service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClubProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub opening_time: Option<TimeOfDay>,
    #[serde(default)]
    pub closing_time: Option<TimeOfDay>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Court {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub base_price_per_hour: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
