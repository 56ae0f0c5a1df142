//! Keygen endpoints.

use actix_web::web;

use freon_db::queries::{groups, messages};
use freon_types::wire::{
    CreateKeygenRequest, CreateKeygenResponse, FinalizeKeygenRequest, JoinKeygenRequest,
    JoinKeygenResponse, KeygenMessageRequest, MessageResponse, PollKeygenRequest,
    PollKeygenResponse, StatusResponse,
};
use freon_types::ErrorKind;

use crate::error::ApiError;
use crate::routes::store;
use crate::AppState;

/// `POST /keygen/create` — allocate a group for a DKG ceremony.
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateKeygenRequest>,
) -> Result<web::Json<CreateKeygenResponse>, ApiError> {
    let conn = store(&state)?;
    let group_id = groups::create(&conn, body.n, body.t)?;
    tracing::info!(%group_id, n = body.n, t = body.t, "keygen ceremony created");
    Ok(web::Json(CreateKeygenResponse { group_id }))
}

/// `POST /keygen/join` — claim the next seat in a group.
pub async fn join(
    state: web::Data<AppState>,
    body: web::Json<JoinKeygenRequest>,
) -> Result<web::Json<JoinKeygenResponse>, ApiError> {
    let mut conn = store(&state)?;
    let (my_party_id, participant_uid) = groups::add_participant(&mut conn, &body.group_id)?;
    tracing::info!(group_id = %body.group_id, %participant_uid, my_party_id, "participant joined");
    Ok(web::Json(JoinKeygenResponse {
        status: true,
        my_party_id,
    }))
}

/// `POST /keygen/poll` — group metadata plus the other parties present.
pub async fn poll(
    state: web::Data<AppState>,
    body: web::Json<PollKeygenRequest>,
) -> Result<web::Json<PollKeygenResponse>, ApiError> {
    let conn = store(&state)?;
    let group = groups::get(&conn, &body.group_id)?;
    let mut parties: Vec<u16> = groups::list_participants(&conn, &body.group_id)?
        .into_iter()
        .map(|p| p.party_id)
        .collect();
    if let Some(me) = body.party_id {
        parties.retain(|p| *p != me);
    }
    Ok(web::Json(PollKeygenResponse {
        group_id: group.uid,
        party_id: body.party_id,
        parties,
        t: group.threshold,
        n: group.participants,
    }))
}

/// `POST /keygen/send` and `/keygen/get-messages` — append an optional
/// payload, then return the log tail past `last-seen`.
pub async fn message(
    state: web::Data<AppState>,
    body: web::Json<KeygenMessageRequest>,
) -> Result<web::Json<MessageResponse>, ApiError> {
    let conn = store(&state)?;
    if !body.message.is_empty() {
        let payload =
            hex::decode(&body.message).map_err(|_| ApiError(ErrorKind::BadEncoding))?;
        messages::append_keygen(&conn, &body.group_id, body.party_id, &payload)?;
    }
    let rows = messages::keygen_since(&conn, &body.group_id, body.last_seen)?;
    let last_seen = rows.last().map_or(body.last_seen, |r| r.row_id);
    let messages = rows.iter().map(|r| hex::encode(&r.payload)).collect();
    Ok(web::Json(MessageResponse { last_seen, messages }))
}

/// `POST /keygen/finalize` — the elected party reports the group key.
pub async fn finalize(
    state: web::Data<AppState>,
    body: web::Json<FinalizeKeygenRequest>,
) -> Result<web::Json<StatusResponse>, ApiError> {
    let conn = store(&state)?;
    groups::finalize_keygen(&conn, &body.group_id, &body.public_key)?;
    tracing::info!(group_id = %body.group_id, reporter = body.party_id, "group key recorded");
    Ok(web::Json(StatusResponse { status: true }))
}
