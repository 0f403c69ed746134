// ============================
// crates/backend-lib/src/handlers/rooms.rs
// ============================
//! Room endpoints under `/streaming/room`.
//!
//! Handlers only translate between HTTP and [`RoomManager`](crate::room::RoomManager):
//! extraction failures become [`AppError::InvalidBody`], everything else is
//! decided by the manager.
use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    Json,
};
use tradingroom_common::{
    ApiResponse, CreateRoomRequest, JoinRoomRequest, ListQuery, Participant, RoomMetadata, RoomPage,
    RoomQuery, TokenData, TokenRequest,
};

use crate::{
    error::AppError,
    middleware::{CallerIdentity, MaybeIdentity},
    room::DEFAULT_PAGE_SIZE,
    validation, AppState,
};

/// `POST /streaming/room/create`
pub async fn create_room(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    body: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenData>>, AppError> {
    let Json(request) = body?;
    let token = state
        .rooms
        .create_room(&identity, &request.room_id, &request.products, &request.title)
        .await?;
    Ok(Json(ApiResponse::success(TokenData { token })))
}

/// `GET /streaming/room/get?roomId=`
pub async fn get_room(
    State(state): State<AppState>,
    query: Result<Query<RoomQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<RoomMetadata>>, AppError> {
    let Query(query) = query?;
    let room_id = query.room_id.unwrap_or_default();
    let metadata = state.rooms.get_room(&room_id).await?;
    Ok(Json(ApiResponse::success(metadata)))
}

/// `GET /streaming/room/list?cursor=&count=`
pub async fn list_rooms(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<RoomPage>>, AppError> {
    let Query(query) = query?;
    let page = state
        .rooms
        .list_rooms_page(query.cursor.unwrap_or(0), query.count.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// `POST /streaming/room/join`
///
/// Behind the identity middleware the caller joins as themselves. On a
/// public join route the participant comes from the body.
pub async fn join_room(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    body: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenData>>, AppError> {
    let Json(request) = body?;

    let participant = match identity {
        Some(identity) => Participant::from(&identity),
        None => participant_from_body(&request)?,
    };

    let token = state.rooms.join_room(&request.room_id, &participant).await?;
    Ok(Json(ApiResponse::success(TokenData { token })))
}

fn participant_from_body(request: &JoinRoomRequest) -> Result<Participant, AppError> {
    let id = request.user_id.clone().unwrap_or_default();
    validation::validate_participant_id(&id)?;
    Ok(Participant {
        id,
        display_name: request.user_name.clone().unwrap_or_default(),
        avatar_url: request.photo.clone().unwrap_or_default(),
    })
}

/// `POST /auth/token`
///
/// Token for the authenticated caller, no room is created or read.
pub async fn issue_token(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenData>>, AppError> {
    let Json(request) = body?;
    let token = state
        .rooms
        .issue_token(&request.room_id, &Participant::from(&identity), request.can_publish)
        .await?;
    Ok(Json(ApiResponse::success(TokenData { token })))
}

/// `DELETE /streaming/room/delete?roomId=`
pub async fn delete_room(
    State(state): State<AppState>,
    query: Result<Query<RoomQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Query(query) = query?;
    let room_id = query.room_id.unwrap_or_default();
    state.rooms.delete_room(&room_id).await?;
    Ok(Json(ApiResponse::ok()))
}
