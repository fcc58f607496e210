use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the order packet prints, read in one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPacket {
    pub id: String,
    pub status: String,
    pub product: Option<String>,
    pub frequency: Option<String>,
    pub frequency_per_week: Option<i64>,
    pub qty_per_change: Option<i64>,
    pub duration_days: Option<i64>,
    pub refills_allowed: Option<i64>,
    pub created_at: DateTime<Utc>,

    pub patient: PacketPatient,
    pub physician: PacketPhysician,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacketPatient {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub insurance_provider: Option<String>,
    pub member_id: Option<String>,
    pub group_id: Option<String>,
    pub payer_phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacketPhysician {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub practice_name: Option<String>,
    pub npi: Option<String>,
    pub license: Option<String>,
    pub license_state: Option<String>,
}
