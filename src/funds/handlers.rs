use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateFundInput, DeletedFund, FundEnvelope, FundList, FundView, UpdateFundInput};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::ApiPath,
    form::FormData,
    response::ApiResponse,
    state::AppState,
    store::Fund,
};

pub const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024; // 20MB

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/funds", get(list_funds))
        .route("/funds/mine", get(list_my_funds))
        .route("/funds/:id", get(get_fund))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/funds", post(create_fund))
        .route(
            "/funds/:id",
            put(update_fund).patch(update_fund).delete(delete_fund),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list_funds(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FundList>>, AppError> {
    let funds = services::list_funds(&state).await?;
    Ok(Json(ApiResponse::success(FundList { funds })))
}

#[instrument(skip(state))]
pub async fn list_my_funds(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<Fund>>>, AppError> {
    let funds = services::list_funds_by_user(&state, user_id).await?;
    Ok(Json(ApiResponse::success(funds)))
}

/// POST /funds (multipart): title, goal, description + one image file
#[instrument(skip(state, form))]
pub async fn create_fund(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut form: FormData,
) -> Result<(StatusCode, Json<ApiResponse<FundEnvelope>>), AppError> {
    let input = CreateFundInput::from_form(&form)?;
    let fund = services::create_fund(&state, user_id, input, form.take_file()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FundEnvelope { fund })),
    ))
}

#[instrument(skip(state))]
pub async fn get_fund(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<Vec<FundView>>>, AppError> {
    let fund = services::get_fund_detail(&state, id).await?;
    Ok(Json(ApiResponse::success(vec![fund])))
}

/// PUT|PATCH /funds/:id (multipart): any of title, goal, description, image
#[instrument(skip(state, form))]
pub async fn update_fund(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<i32>,
    mut form: FormData,
) -> Result<Json<ApiResponse<FundEnvelope>>, AppError> {
    let input = UpdateFundInput::from_form(&form)?;
    let fund = services::update_fund(&state, user_id, id, input, form.take_file()).await?;
    Ok(Json(ApiResponse::success(FundEnvelope { fund })))
}

#[instrument(skip(state))]
pub async fn delete_fund(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<DeletedFund>>, AppError> {
    services::delete_fund(&state, user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedFund { id })))
}
