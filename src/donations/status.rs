use std::fmt;

use serde::{Deserialize, Serialize};

/// Review state of a donation. New donations start as `Pending`; the fund
/// owner moves them to `Accepted` or `Rejected` once the proof is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "donation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DonationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Accepted => "accepted",
            DonationStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are final.
    pub fn can_transition_to(self, next: DonationStatus) -> bool {
        use DonationStatus::*;
        self == next || matches!((self, next), (Pending, Accepted) | (Pending, Rejected))
    }
}

impl TryFrom<String> for DonationStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "accepted" => Ok(DonationStatus::Accepted),
            "rejected" => Ok(DonationStatus::Rejected),
            _ => Err("\"status\" must be one of [pending, accepted, rejected]".into()),
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
