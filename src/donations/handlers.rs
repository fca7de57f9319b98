use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::dto::{DonationDetail, DonationInput, DonationPatch, UserDonationView};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    form::FormData,
    funds::{dto::FundView, handlers::UPLOAD_BODY_LIMIT},
    response::ApiResponse,
    state::AppState,
};

/// `/funds/:id/donations/:donation_id`
#[derive(Debug, Deserialize)]
pub struct DonationPath {
    id: i32,
    donation_id: i32,
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/donations/mine", get(list_my_donations))
        .route(
            "/funds/:id/donations/:donation_id",
            get(get_donation).patch(update_donation),
        )
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/funds/:id/donations", post(create_donation))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// POST /funds/:id/donations (multipart): donateAmount + proof image
#[instrument(skip(state, form))]
pub async fn create_donation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(fund_id): ApiPath<i32>,
    mut form: FormData,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FundView>>>), AppError> {
    let input = DonationInput {
        fund_id,
        user_id,
        donate_amount: form.required_number("donateAmount")?,
    };
    let fund = services::create_donation(&state, input, form.take_file()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(vec![fund]))))
}

#[instrument(skip(state, patch))]
pub async fn update_donation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(DonationPath { id: fund_id, donation_id }): ApiPath<DonationPath>,
    ApiJson(patch): ApiJson<DonationPatch>,
) -> Result<Json<ApiResponse<Vec<FundView>>>, AppError> {
    let fund =
        services::update_donation_status(&state, user_id, fund_id, donation_id, patch).await?;
    Ok(Json(ApiResponse::success(vec![fund])))
}

#[instrument(skip(state))]
pub async fn get_donation(
    State(state): State<AppState>,
    ApiPath(DonationPath { id: fund_id, donation_id }): ApiPath<DonationPath>,
) -> Result<Json<ApiResponse<DonationDetail>>, AppError> {
    let detail = services::get_donation_detail(&state, fund_id, donation_id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[instrument(skip(state))]
pub async fn list_my_donations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<UserDonationView>>>, AppError> {
    let donations = services::list_donations_by_user(&state, user_id).await?;
    Ok(Json(ApiResponse::success(donations)))
}
