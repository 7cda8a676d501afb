use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::auth::{AuthUser, MaybeUser};
use super::dto::{
    ListQuery, NowPlayingResponse, QueueResponse, RegisterRequest, RegisterResponse,
    RemoveVoteRequest, StreamResponse, SubmitRequest, SubmitResponse, VoteRequest, VoteResponse,
};
use super::extract::JsonBody;
use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{Direction, QueueEntry};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(register))
        .route("/streams", get(list_streams).post(submit_stream))
        .route("/streams/my", get(my_streams))
        .route("/streams/now", get(now_playing))
        .route("/streams/upvotes", post(vote))
        .route("/streams/downvotes", post(remove_vote))
}

async fn health() -> &'static str {
    "ok"
}

/// POST /users - sign-in upsert from the identity provider
async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let user = state.queue.register_user(&req.email, &req.provider).await?;
    Ok(Json(RegisterResponse { id: user.id }))
}

/// POST /streams - queue a YouTube link on a creator's stream
async fn submit_stream(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let item = state.queue.submit(&req.creator_id, &req.url).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Stream Added",
            id: item.id,
        }),
    ))
}

/// GET /streams?creatorId=.. - ranked queue, with the caller's votes if signed in
async fn list_streams(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<QueueResponse>> {
    let creator_id = required_creator(query)?;
    let entries = state
        .queue
        .list_queue(&creator_id, viewer.as_deref())
        .await?;
    Ok(Json(queue_response(entries, state.poll_interval_secs)))
}

/// GET /streams/now?creatorId=.. - head of the ranked queue
async fn now_playing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NowPlayingResponse>> {
    let creator_id = required_creator(query)?;
    let stream = state
        .queue
        .now_playing(&creator_id)
        .await?
        .map(StreamResponse::from);
    Ok(Json(NowPlayingResponse { stream }))
}

/// GET /streams/my - the caller's own stream
async fn my_streams(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<QueueResponse>> {
    let entries = state.queue.list_own(&user_id).await?;
    Ok(Json(queue_response(entries, state.poll_interval_secs)))
}

/// POST /streams/upvotes - cast or switch a vote
async fn vote(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let direction: Direction = req.direction.parse()?;
    let result = state
        .queue
        .vote(&user_id, &req.stream_id, direction)
        .await?;
    Ok(Json(VoteResponse::from(result)))
}

/// POST /streams/downvotes - withdraw the caller's vote
async fn remove_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<RemoveVoteRequest>,
) -> Result<Json<VoteResponse>> {
    let result = state.queue.remove_vote(&user_id, &req.stream_id).await?;
    Ok(Json(VoteResponse::from(result)))
}

fn required_creator(query: ListQuery) -> Result<String> {
    query
        .creator_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Creator ID is required".to_string()))
}

fn queue_response(entries: Vec<QueueEntry>, poll_interval_secs: u64) -> QueueResponse {
    let mut user_votes = HashMap::new();
    let streams = entries
        .into_iter()
        .map(|entry| {
            if let Some(direction) = entry.viewer_direction {
                user_votes.insert(entry.item.id.clone(), direction);
            }
            StreamResponse::from(entry.item)
        })
        .collect();

    QueueResponse {
        streams,
        user_votes,
        poll_interval_secs,
    }
}
