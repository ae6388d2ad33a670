use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use council_core::auth::{grant_admin, require_super_admin};
use council_core::contact::{self, ContactForm};
use council_core::faq::{self, FaqInput, FaqPatch};
use council_core::filter::QuestionFilter;
use council_core::likes::toggle_like;
use council_core::media::generate_upload_url;
use council_core::members::{self, MemberInput, MemberPatch};
use council_core::news::{self, NewsInput, NewsPatch};
use council_core::query::{self, ListQuestionsPaginated, PaginationOpts, SearchQuestionsPaged};
use council_core::questions::{self, QuestionInput, QuestionPatch, ResponseInput};
use council_core::rankings::load_rankings;
use council_core::schema::{
    AdminRole, AdminUser, ContactStatus, ContactSubmission, CouncilMember, CursorPage,
    EnrichedQuestion, Faq, FaqGroup, Id, LikeState, News, Question, QuestionDetail, QuestionPage,
    SlideshowSlide,
};
use council_core::rankings::Rankings;
use council_core::slides::{self, SlideInput, SlidePatch};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{AppState, Caller};

type ApiResult<T> = Result<T, AppError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    pub id: Id,
}

fn created(id: Id) -> impl IntoResponse {
    (StatusCode::CREATED, Json(Created { id }))
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Questions

pub async fn list_questions_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<QuestionFilter>,
) -> ApiResult<Json<Vec<EnrichedQuestion>>> {
    let rows = state.query(&caller, move |ctx| query::list_questions(ctx, &filter)).await?;
    Ok(Json(rows))
}

pub async fn search_questions_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(mut args): Query<SearchQuestionsPaged>,
) -> ApiResult<Json<QuestionPage>> {
    args.page_size = args.page_size.or(Some(state.config.listing.default_page_size));
    let page = state.query(&caller, move |ctx| query::search_questions_paged(ctx, args)).await?;
    Ok(Json(page))
}

/// Flat query-string shape of `ListQuestionsPaginated`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedParams {
    pub num_items: usize,
    pub cursor: Option<String>,
    pub category: Option<String>,
    pub member_id: Option<String>,
    pub search_term: Option<String>,
}

impl From<PaginatedParams> for ListQuestionsPaginated {
    fn from(params: PaginatedParams) -> Self {
        Self {
            pagination_opts: PaginationOpts {
                num_items: params.num_items,
                cursor: params.cursor,
            },
            category: params.category,
            member_id: params.member_id,
            search_term: params.search_term,
        }
    }
}

pub async fn paginated_questions_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PaginatedParams>,
) -> ApiResult<Json<CursorPage>> {
    let page = state
        .query(&caller, move |ctx| query::list_questions_paginated(ctx, params.into()))
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

pub async fn top_liked_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<EnrichedQuestion>>> {
    let limit = params.limit.unwrap_or(state.config.listing.top_liked_limit);
    let rows = state.query(&caller, move |ctx| query::get_top_liked_questions(ctx, limit)).await?;
    Ok(Json(rows))
}

pub async fn question_detail_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<QuestionDetail>> {
    state
        .query(&caller, move |ctx| query::get_question(ctx, &id))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("question"))
}

pub async fn create_question_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<QuestionInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state
        .with_conn(move |conn, _| questions::create_question(conn, caller.id(), input))
        .await?;
    Ok(created(id))
}

pub async fn update_question_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<QuestionPatch>,
) -> ApiResult<Json<Question>> {
    let question = state
        .with_conn(move |conn, _| questions::update_question(conn, caller.id(), &id, patch))
        .await?;
    Ok(Json(question))
}

pub async fn delete_question_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.with_conn(move |conn, _| questions::delete_question(conn, caller.id(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeState>> {
    let like = state.with_conn(move |conn, _| toggle_like(conn, caller.id(), &id)).await?;
    Ok(Json(like))
}

pub async fn create_response_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(question_id): Path<String>,
    Json(input): Json<ResponseInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state
        .with_conn(move |conn, _| questions::create_response(conn, caller.id(), &question_id, input))
        .await?;
    Ok(created(id))
}

pub async fn delete_response_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.with_conn(move |conn, _| questions::delete_response(conn, caller.id(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Members

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberParams {
    #[serde(default)]
    pub active_only: bool,
}

pub async fn list_members_handler(
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> ApiResult<Json<Vec<CouncilMember>>> {
    let rows = state
        .with_conn(move |conn, blobs| members::list_members(conn, blobs, params.active_only))
        .await?;
    Ok(Json(rows))
}

pub async fn member_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CouncilMember>> {
    state
        .with_conn(move |conn, blobs| members::get_member(conn, blobs, &id))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("member"))
}

pub async fn create_member_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<MemberInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state
        .with_conn(move |conn, _| members::create_member(conn, caller.id(), input))
        .await?;
    Ok(created(id))
}

pub async fn update_member_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<MemberPatch>,
) -> ApiResult<Json<CouncilMember>> {
    let member = state
        .with_conn(move |conn, _| members::update_member(conn, caller.id(), &id, patch))
        .await?;
    Ok(Json(member))
}

pub async fn rankings_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Rankings>> {
    let limit = params.limit.unwrap_or(state.config.listing.top_liked_limit);
    let rankings = state.query(&caller, move |ctx| load_rankings(ctx, limit)).await?;
    Ok(Json(rankings))
}

// News

pub async fn list_news_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<News>>> {
    let rows = state.with_conn(move |conn, blobs| news::list_published_news(conn, blobs)).await?;
    Ok(Json(rows))
}

pub async fn recent_news_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<News>>> {
    let limit = params.limit.unwrap_or(state.config.listing.recent_news_limit);
    let rows = state
        .with_conn(move |conn, blobs| news::get_recent_news(conn, blobs, Some(limit)))
        .await?;
    Ok(Json(rows))
}

pub async fn news_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<News>> {
    state
        .with_conn(move |conn, blobs| news::get_news_by_id(conn, blobs, &id))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("news"))
}

pub async fn admin_news_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<News>>> {
    let rows = state
        .with_conn(move |conn, blobs| news::list_all_news(conn, blobs, caller.id()))
        .await?;
    Ok(Json(rows))
}

pub async fn create_news_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewsInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state.with_conn(move |conn, _| news::create_news(conn, caller.id(), input)).await?;
    Ok(created(id))
}

pub async fn update_news_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<NewsPatch>,
) -> ApiResult<Json<News>> {
    let item = state
        .with_conn(move |conn, _| news::update_news(conn, caller.id(), &id, patch))
        .await?;
    Ok(Json(item))
}

pub async fn delete_news_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.with_conn(move |conn, _| news::delete_news(conn, caller.id(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Slides

pub async fn list_slides_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<SlideshowSlide>>> {
    let rows = state.with_conn(move |conn, blobs| slides::list_active_slides(conn, blobs)).await?;
    Ok(Json(rows))
}

pub async fn create_slide_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<SlideInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state.with_conn(move |conn, _| slides::create_slide(conn, caller.id(), input)).await?;
    Ok(created(id))
}

pub async fn update_slide_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<SlidePatch>,
) -> ApiResult<Json<SlideshowSlide>> {
    let slide = state
        .with_conn(move |conn, _| slides::update_slide(conn, caller.id(), &id, patch))
        .await?;
    Ok(Json(slide))
}

pub async fn delete_slide_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.with_conn(move |conn, _| slides::delete_slide(conn, caller.id(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// FAQ

pub async fn list_faqs_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<FaqGroup>>> {
    let groups = state.with_conn(|conn, _| faq::list_faqs(conn)).await?;
    Ok(Json(groups))
}

pub async fn create_faq_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<FaqInput>,
) -> ApiResult<impl IntoResponse> {
    let id = state.with_conn(move |conn, _| faq::create_faq(conn, caller.id(), input)).await?;
    Ok(created(id))
}

pub async fn update_faq_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<FaqPatch>,
) -> ApiResult<Json<Faq>> {
    let item = state
        .with_conn(move |conn, _| faq::update_faq(conn, caller.id(), &id, patch))
        .await?;
    Ok(Json(item))
}

pub async fn delete_faq_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.with_conn(move |conn, _| faq::delete_faq(conn, caller.id(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Contact

pub async fn submit_contact_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<ContactForm>,
) -> ApiResult<impl IntoResponse> {
    let id = state
        .with_conn(move |conn, _| contact::submit_contact_form(conn, caller.id(), form))
        .await?;
    Ok(created(id))
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    pub status: Option<ContactStatus>,
}

pub async fn contact_inbox_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<InboxParams>,
) -> ApiResult<Json<Vec<ContactSubmission>>> {
    let rows = state
        .with_conn(move |conn, _| contact::list_contact_submissions(conn, caller.id(), params.status))
        .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: ContactStatus,
}

pub async fn contact_status_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<StatusCode> {
    state
        .with_conn(move |conn, _| contact::set_contact_status(conn, caller.id(), &id, body.status))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Uploads and grants

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
}

pub async fn upload_url_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<UploadTarget>> {
    let upload_url = state
        .with_conn(move |conn, blobs| generate_upload_url(conn, blobs, caller.id()))
        .await?;
    Ok(Json(UploadTarget { upload_url }))
}

#[derive(Debug, Deserialize)]
pub struct GrantBody {
    pub email: String,
    pub role: AdminRole,
}

pub async fn grant_admin_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<GrantBody>,
) -> ApiResult<Json<AdminUser>> {
    let admin = state
        .with_conn(move |conn, _| {
            let granter = require_super_admin(conn, caller.id())?;
            grant_admin(conn, &body.email, body.role, Some(&granter.user_id))
        })
        .await?;
    Ok(Json(admin))
}
