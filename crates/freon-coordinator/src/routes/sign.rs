//! Signing-ceremony endpoints.

use actix_web::web;

use freon_db::queries::{ceremonies, messages};
use freon_types::wire::{
    CreateSignRequest, CreateSignResponse, FinalizeSignRequest, GetSignatureRequest,
    GetSignatureResponse, JoinSignRequest, JoinSignResponse, ListSignRequest, ListSignResponse,
    MessageResponse, PollSignRequest, PollSignResponse, SignMessageRequest, StatusResponse,
    TerminateRequest,
};
use freon_types::ErrorKind;

use crate::error::ApiError;
use crate::routes::store;
use crate::AppState;

/// `POST /sign/create` — open a ceremony over a group, pinning the sanity
/// hash of the candidate message.
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateSignRequest>,
) -> Result<web::Json<CreateSignResponse>, ApiError> {
    let conn = store(&state)?;
    let ceremony_id = ceremonies::create(
        &conn,
        &body.group_id,
        &body.hash,
        body.openssh,
        &body.openssh_namespace,
    )?;
    tracing::info!(%ceremony_id, group_id = %body.group_id, "signing ceremony created");
    Ok(web::Json(CreateSignResponse { ceremony_id }))
}

/// `POST /sign/join` — enroll a party, verifying its sanity hash.
pub async fn join(
    state: web::Data<AppState>,
    body: web::Json<JoinSignRequest>,
) -> Result<web::Json<JoinSignResponse>, ApiError> {
    let conn = store(&state)?;
    let ceremony = ceremonies::join(&conn, &body.ceremony_id, &body.hash, body.party_id)?;
    tracing::info!(ceremony_id = %body.ceremony_id, party_id = body.party_id, "player joined");
    Ok(web::Json(JoinSignResponse {
        status: true,
        openssh: ceremony.openssh,
        openssh_namespace: ceremony.openssh_namespace.unwrap_or_default(),
    }))
}

/// `POST /sign/poll` — ceremony metadata plus the other enrolled players.
pub async fn poll(
    state: web::Data<AppState>,
    body: web::Json<PollSignRequest>,
) -> Result<web::Json<PollSignResponse>, ApiError> {
    let conn = store(&state)?;
    let (group_id, t, parties) = ceremonies::poll(&conn, &body.ceremony_id, body.party_id)?;
    Ok(web::Json(PollSignResponse {
        group_id,
        party_id: body.party_id,
        t,
        parties,
    }))
}

/// `POST /sign/send` and `/sign/get-messages`.
pub async fn message(
    state: web::Data<AppState>,
    body: web::Json<SignMessageRequest>,
) -> Result<web::Json<MessageResponse>, ApiError> {
    let conn = store(&state)?;
    if !body.message.is_empty() {
        let payload =
            hex::decode(&body.message).map_err(|_| ApiError(ErrorKind::BadEncoding))?;
        messages::append_sign(&conn, &body.ceremony_id, body.party_id, &payload)?;
    }
    let rows = messages::sign_since(&conn, &body.ceremony_id, body.last_seen)?;
    let last_seen = rows.last().map_or(body.last_seen, |r| r.row_id);
    let messages = rows.iter().map(|r| hex::encode(&r.payload)).collect();
    Ok(web::Json(MessageResponse { last_seen, messages }))
}

/// `POST /sign/finalize` — the elected party reports the signature, which
/// closes the ceremony.
pub async fn finalize(
    state: web::Data<AppState>,
    body: web::Json<FinalizeSignRequest>,
) -> Result<web::Json<StatusResponse>, ApiError> {
    let conn = store(&state)?;
    ceremonies::finalize_sign(&conn, &body.ceremony_id, &body.signature)?;
    tracing::info!(ceremony_id = %body.ceremony_id, reporter = body.party_id, "signature recorded");
    Ok(web::Json(StatusResponse { status: true }))
}

/// `POST /sign/get` — fetch a finalized signature.
pub async fn get(
    state: web::Data<AppState>,
    body: web::Json<GetSignatureRequest>,
) -> Result<web::Json<GetSignatureResponse>, ApiError> {
    let conn = store(&state)?;
    let signature = ceremonies::get_signature(&conn, &body.ceremony_id)?;
    Ok(web::Json(GetSignatureResponse { signature }))
}

/// `POST /sign/list` — active ceremonies for a group, newest first.
pub async fn list(
    state: web::Data<AppState>,
    body: web::Json<ListSignRequest>,
) -> Result<web::Json<ListSignResponse>, ApiError> {
    let conn = store(&state)?;
    let ceremonies = ceremonies::list_active(&conn, &body.group_id, body.limit, body.offset)?;
    Ok(web::Json(ListSignResponse { ceremonies }))
}

/// `POST /terminate` — close a ceremony without a signature.
///
/// Unauthenticated by design: anyone who can name a ceremony may stop it.
pub async fn terminate(
    state: web::Data<AppState>,
    body: web::Json<TerminateRequest>,
) -> Result<web::Json<StatusResponse>, ApiError> {
    let conn = store(&state)?;
    ceremonies::terminate(&conn, &body.ceremony_id)?;
    tracing::info!(ceremony_id = %body.ceremony_id, "ceremony terminated");
    Ok(web::Json(StatusResponse { status: true }))
}
