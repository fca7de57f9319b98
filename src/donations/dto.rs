use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use super::status::DonationStatus;
use crate::error::AppError;
use crate::store::{DonationWithDonor, UserDonationRow};

#[derive(Debug, Clone, Validate)]
pub struct DonationInput {
    #[validate(range(min = 1, message = "\"fundId\" must be a positive number"))]
    pub fund_id: i32,
    #[validate(range(min = 1, message = "\"userId\" must be a positive number"))]
    pub user_id: i32,
    #[validate(range(min = 3, message = "\"donateAmount\" must be greater than or equal to 3"))]
    pub donate_amount: i32,
}

/// Body of a donation review. Only these two fields may change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DonationPatch {
    pub status: Option<DonationStatus>,
    #[validate(range(min = 3, message = "\"donateAmount\" must be greater than or equal to 3"))]
    pub donate_amount: Option<i32>,
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

impl DonationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.donate_amount.is_none()
    }

    pub fn reject_unknown(&self) -> Result<(), AppError> {
        match self.unknown.keys().min() {
            Some(key) => Err(AppError::Validation(format!("\"{}\" is not allowed", key))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DonationDetail {
    pub id: i32,
    pub name: String,
    pub amount: i32,
    pub image: String,
}

impl From<DonationWithDonor> for DonationDetail {
    fn from(d: DonationWithDonor) -> Self {
        Self {
            id: d.id,
            name: d.full_name,
            amount: d.donate_amount,
            image: d.proof_attachment,
        }
    }
}

/// Entry of the caller's donation history.
#[derive(Debug, Serialize)]
pub struct UserDonationView {
    pub id: i32,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub amount: i32,
    pub status: DonationStatus,
}

impl From<UserDonationRow> for UserDonationView {
    fn from(r: UserDonationRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            date: r.created_at,
            amount: r.donate_amount,
            status: r.status,
        }
    }
}
