use serde::Serialize;
use time::OffsetDateTime;
use validator::Validate;

use crate::donations::status::DonationStatus;
use crate::error::AppError;
use crate::form::FormData;
use crate::store::{DonationWithDonor, Fund, FundWithDonations};

#[derive(Debug, Clone, Validate)]
pub struct CreateFundInput {
    #[validate(length(min = 3, message = "\"title\" length must be at least 3 characters long"))]
    pub title: String,
    #[validate(range(min = 5, message = "\"goal\" must be greater than or equal to 5"))]
    pub goal: i32,
    #[validate(length(min = 5, message = "\"description\" length must be at least 5 characters long"))]
    pub description: String,
}

impl CreateFundInput {
    pub fn from_form(form: &FormData) -> Result<Self, AppError> {
        Ok(Self {
            title: form.required_text("title")?,
            goal: form.required_number("goal")?,
            description: form.required_text("description")?,
        })
    }
}

/// Same rules as creation, every field optional.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateFundInput {
    #[validate(length(min = 3, message = "\"title\" length must be at least 3 characters long"))]
    pub title: Option<String>,
    #[validate(range(min = 5, message = "\"goal\" must be greater than or equal to 5"))]
    pub goal: Option<i32>,
    #[validate(length(min = 5, message = "\"description\" length must be at least 5 characters long"))]
    pub description: Option<String>,
}

impl UpdateFundInput {
    pub fn from_form(form: &FormData) -> Result<Self, AppError> {
        Ok(Self {
            title: form.text("title"),
            goal: form.number("goal")?,
            description: form.text("description"),
        })
    }
}

/// One donation as shown under a fund.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorView {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub donate_amount: i32,
    pub status: DonationStatus,
    pub proof_attachment: String,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<OffsetDateTime>,
}

impl DonorView {
    fn from_row(d: DonationWithDonor, with_date: bool) -> Self {
        Self {
            id: d.id,
            full_name: d.full_name,
            email: d.email,
            donate_amount: d.donate_amount,
            status: d.status,
            proof_attachment: d.proof_attachment,
            date: with_date.then_some(d.created_at),
        }
    }
}

/// A fund flattened together with everyone who donated to it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundView {
    pub id: i32,
    pub title: String,
    pub thumbnail: String,
    pub goal: i32,
    pub description: String,
    pub users_donate: Vec<DonorView>,
}

impl FundView {
    fn project(agg: FundWithDonations, with_date: bool) -> Self {
        let FundWithDonations { fund, donations } = agg;
        Self {
            users_donate: donations
                .into_iter()
                .map(|d| DonorView::from_row(d, with_date))
                .collect(),
            ..Self::without_donations(fund)
        }
    }

    pub fn summary(agg: FundWithDonations) -> Self {
        Self::project(agg, false)
    }

    /// Like `summary`, plus the date of each donation.
    pub fn detailed(agg: FundWithDonations) -> Self {
        Self::project(agg, true)
    }

    pub fn without_donations(fund: Fund) -> Self {
        Self {
            id: fund.id,
            title: fund.title,
            thumbnail: fund.thumbnail,
            goal: fund.goal,
            description: fund.description,
            users_donate: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FundList {
    pub funds: Vec<FundView>,
}

#[derive(Debug, Serialize)]
pub struct FundEnvelope {
    pub fund: FundView,
}

#[derive(Debug, Serialize)]
pub struct DeletedFund {
    pub id: i32,
}
