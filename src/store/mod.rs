use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::donations::status::DonationStatus;

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Fund record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub id: i32,
    pub title: String,
    pub goal: i32,
    pub description: String,
    pub thumbnail: String, // media store public id
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Donation row joined with the donor's identity.
#[derive(Debug, Clone, FromRow)]
pub struct DonationWithDonor {
    pub id: i32,
    pub fund_id: i32,
    pub donate_amount: i32,
    pub status: DonationStatus,
    pub proof_attachment: String,
    pub created_at: OffsetDateTime,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct FundWithDonations {
    pub fund: Fund,
    pub donations: Vec<DonationWithDonor>,
}

/// Donation row joined with its fund's title.
#[derive(Debug, Clone, FromRow)]
pub struct UserDonationRow {
    pub id: i32,
    pub title: String,
    pub donate_amount: i32,
    pub status: DonationStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFund {
    pub title: String,
    pub goal: i32,
    pub description: String,
    pub thumbnail: String,
}

/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct FundChanges {
    pub title: Option<String>,
    pub goal: Option<i32>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub fund_id: i32,
    pub user_id: i32,
    pub donate_amount: i32,
    pub proof_attachment: String,
}

#[derive(Debug, Clone, Default)]
pub struct DonationChanges {
    pub status: Option<DonationStatus>,
    pub donate_amount: Option<i32>,
    /// When set, the row is only updated while it still has this status.
    pub expected_status: Option<DonationStatus>,
}

/// Relational store holding users, funds, fund ownership and donations.
/// Deleting a fund or user removes its donations and ownership rows.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_funds(&self) -> anyhow::Result<Vec<FundWithDonations>>;

    async fn find_fund(&self, fund_id: i32) -> anyhow::Result<Option<FundWithDonations>>;

    async fn fund_exists(&self, fund_id: i32) -> anyhow::Result<bool>;

    async fn user_exists(&self, user_id: i32) -> anyhow::Result<bool>;

    async fn list_funds_by_owner(&self, user_id: i32) -> anyhow::Result<Vec<Fund>>;

    async fn is_fund_owner(&self, fund_id: i32, user_id: i32) -> anyhow::Result<bool>;

    /// Inserts the fund and its ownership row atomically.
    async fn create_fund(&self, owner_id: i32, fund: NewFund) -> anyhow::Result<Fund>;

    async fn update_fund(&self, fund_id: i32, changes: FundChanges) -> anyhow::Result<Option<Fund>>;

    /// Returns the number of funds removed.
    async fn delete_fund(&self, fund_id: i32) -> anyhow::Result<u64>;

    /// Inserts a pending donation and returns the fund as it stands after the
    /// insert, or `None` when the fund does not exist.
    async fn add_donation(&self, donation: NewDonation) -> anyhow::Result<Option<FundWithDonations>>;

    async fn find_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
    ) -> anyhow::Result<Option<DonationWithDonor>>;

    /// Applies the changes and returns the refreshed fund, or `None` when no
    /// such donation exists under the fund or its status is no longer
    /// `expected_status`.
    async fn update_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
        changes: DonationChanges,
    ) -> anyhow::Result<Option<FundWithDonations>>;

    async fn list_donations_by_user(&self, user_id: i32) -> anyhow::Result<Vec<UserDonationRow>>;
}
