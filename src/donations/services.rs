use tracing::{info, warn};
use validator::Validate;

use super::dto::{DonationDetail, DonationInput, DonationPatch, UserDonationView};
use super::status::DonationStatus;
use crate::error::AppError;
use crate::funds::dto::FundView;
use crate::funds::services::ensure_owner;
use crate::images::services::upload_image;
use crate::state::AppState;
use crate::storage::UploadFile;
use crate::store::{DonationChanges, NewDonation};

/// Records a pending donation with its proof of payment and returns the fund
/// as it looks afterwards.
pub async fn create_donation(
    st: &AppState,
    input: DonationInput,
    proof: Option<UploadFile>,
) -> Result<FundView, AppError> {
    input.validate()?;
    if !st.store.fund_exists(input.fund_id).await? {
        return Err(AppError::NotFound("fund"));
    }
    let proof_attachment = upload_image(st, proof).await?;

    let fund = st
        .store
        .add_donation(NewDonation {
            fund_id: input.fund_id,
            user_id: input.user_id,
            donate_amount: input.donate_amount,
            proof_attachment,
        })
        .await?
        .ok_or(AppError::NotFound("fund"))?;

    info!(
        fund_id = input.fund_id,
        donor_id = input.user_id,
        amount = input.donate_amount,
        "donation recorded"
    );
    Ok(FundView::summary(fund))
}

/// Owner review of a donation. Status moves only along
/// `pending -> accepted | rejected`.
pub async fn update_donation_status(
    st: &AppState,
    actor_id: i32,
    fund_id: i32,
    donation_id: i32,
    patch: DonationPatch,
) -> Result<FundView, AppError> {
    patch.reject_unknown()?;
    patch.validate()?;
    if patch.is_empty() {
        return Err(AppError::Validation(
            "\"status\" or \"donateAmount\" is required".into(),
        ));
    }

    let current = st
        .store
        .find_donation(fund_id, donation_id)
        .await?
        .ok_or(AppError::NotFound("donation"))?;
    ensure_owner(st, fund_id, actor_id).await?;

    if let Some(next) = patch.status {
        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
    }

    let changes = DonationChanges {
        status: patch.status,
        donate_amount: patch.donate_amount,
        expected_status: patch.status.map(|_| current.status),
    };
    let Some(fund) = st.store.update_donation(fund_id, donation_id, changes).await? else {
        return Err(stale_update(st, fund_id, donation_id, patch.status).await);
    };

    info!(fund_id, donation_id, actor_id, status = ?patch.status, "donation updated");
    Ok(FundView::summary(fund))
}

/// The donation vanished or another review moved it since it was read.
async fn stale_update(
    st: &AppState,
    fund_id: i32,
    donation_id: i32,
    next: Option<DonationStatus>,
) -> AppError {
    let latest = match st.store.find_donation(fund_id, donation_id).await {
        Ok(latest) => latest,
        Err(e) => return e.into(),
    };
    match (latest, next) {
        (Some(latest), Some(next)) => {
            warn!(fund_id, donation_id, from = %latest.status, to = %next, "concurrent donation review");
            AppError::InvalidTransition {
                from: latest.status,
                to: next,
            }
        }
        _ => AppError::NotFound("donation"),
    }
}

pub async fn get_donation_detail(
    st: &AppState,
    fund_id: i32,
    donation_id: i32,
) -> Result<DonationDetail, AppError> {
    let donation = st
        .store
        .find_donation(fund_id, donation_id)
        .await?
        .ok_or(AppError::NotFound("donation"))?;
    Ok(donation.into())
}

pub async fn list_donations_by_user(
    st: &AppState,
    user_id: i32,
) -> Result<Vec<UserDonationView>, AppError> {
    let rows = st.store.list_donations_by_user(user_id).await?;
    Ok(rows.into_iter().map(UserDonationView::from).collect())
}
