use tracing::info;
use validator::Validate;

use super::dto::{CreateFundInput, FundView, UpdateFundInput};
use crate::error::AppError;
use crate::images::services::upload_image;
use crate::state::AppState;
use crate::storage::UploadFile;
use crate::store::{Fund, FundChanges, NewFund};

pub async fn list_funds(st: &AppState) -> Result<Vec<FundView>, AppError> {
    let funds = st.store.list_funds().await?;
    Ok(funds.into_iter().map(FundView::summary).collect())
}

pub async fn list_funds_by_user(st: &AppState, user_id: i32) -> Result<Vec<Fund>, AppError> {
    if !st.store.user_exists(user_id).await? {
        return Err(AppError::NotFound("user"));
    }
    Ok(st.store.list_funds_by_owner(user_id).await?)
}

/// Validates, uploads the thumbnail, then stores the fund and its owner.
pub async fn create_fund(
    st: &AppState,
    owner_id: i32,
    input: CreateFundInput,
    image: Option<UploadFile>,
) -> Result<FundView, AppError> {
    input.validate()?;
    let thumbnail = upload_image(st, image).await?;

    let fund = st
        .store
        .create_fund(
            owner_id,
            NewFund {
                title: input.title,
                goal: input.goal,
                description: input.description,
                thumbnail,
            },
        )
        .await?;

    info!(fund_id = fund.id, owner_id, "fund created");
    Ok(FundView::without_donations(fund))
}

pub async fn get_fund_detail(st: &AppState, fund_id: i32) -> Result<FundView, AppError> {
    let fund = st
        .store
        .find_fund(fund_id)
        .await?
        .ok_or(AppError::NotFound("fund"))?;
    Ok(FundView::detailed(fund))
}

pub async fn update_fund(
    st: &AppState,
    actor_id: i32,
    fund_id: i32,
    input: UpdateFundInput,
    image: Option<UploadFile>,
) -> Result<FundView, AppError> {
    input.validate()?;
    ensure_owner(st, fund_id, actor_id).await?;

    let thumbnail = match image {
        Some(file) => Some(upload_image(st, Some(file)).await?),
        None => None,
    };

    let fund = st
        .store
        .update_fund(
            fund_id,
            FundChanges {
                title: input.title,
                goal: input.goal,
                description: input.description,
                thumbnail,
            },
        )
        .await?
        .ok_or(AppError::NotFound("fund"))?;

    info!(fund_id, actor_id, "fund updated");
    Ok(FundView::without_donations(fund))
}

pub async fn delete_fund(st: &AppState, actor_id: i32, fund_id: i32) -> Result<(), AppError> {
    ensure_owner(st, fund_id, actor_id).await?;
    if st.store.delete_fund(fund_id).await? == 0 {
        return Err(AppError::NotFound("fund"));
    }
    info!(fund_id, actor_id, "fund deleted");
    Ok(())
}

/// NotFound when the fund is missing, Forbidden when `user_id` doesn't own it.
pub(crate) async fn ensure_owner(st: &AppState, fund_id: i32, user_id: i32) -> Result<(), AppError> {
    if !st.store.fund_exists(fund_id).await? {
        return Err(AppError::NotFound("fund"));
    }
    if !st.store.is_fund_owner(fund_id, user_id).await? {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
