//! The POST-only JSON API.
//!
//! Handlers are thin: parse the body, take the store lock, call the matching
//! store operation, shape the response. Protocol payloads pass through as
//! hex without inspection.

pub mod keygen;
pub mod sign;

use std::sync::MutexGuard;

use actix_web::{web, HttpResponse};
use rusqlite::Connection;

use crate::error::ApiError;
use crate::AppState;

/// Wire up every endpoint.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/keygen/create", web::post().to(keygen::create))
        .route("/keygen/join", web::post().to(keygen::join))
        .route("/keygen/poll", web::post().to(keygen::poll))
        .route("/keygen/send", web::post().to(keygen::message))
        .route("/keygen/get-messages", web::post().to(keygen::message))
        .route("/keygen/finalize", web::post().to(keygen::finalize))
        .route("/sign/create", web::post().to(sign::create))
        .route("/sign/join", web::post().to(sign::join))
        .route("/sign/poll", web::post().to(sign::poll))
        .route("/sign/send", web::post().to(sign::message))
        .route("/sign/get-messages", web::post().to(sign::message))
        .route("/sign/finalize", web::post().to(sign::finalize))
        .route("/sign/get", web::post().to(sign::get))
        .route("/sign/list", web::post().to(sign::list))
        .route("/terminate", web::post().to(sign::terminate));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Freon Coordinator v{}", env!("CARGO_PKG_VERSION")),
    }))
}

/// Take the store lock for the duration of one operation.
pub(crate) fn store<'a>(
    state: &'a web::Data<AppState>,
) -> Result<MutexGuard<'a, Connection>, ApiError> {
    state.db.lock().map_err(|_| ApiError::internal())
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use serde_json::json;

    use freon_types::wire::*;

    use super::*;

    macro_rules! test_app {
        () => {{
            let db = freon_db::open_memory().expect("open in-memory db");
            let state = web::Data::new(AppState::new(db));
            test::init_service(App::new().app_data(state).configure(configure)).await
        }};
    }

    /// POST a JSON body and parse the OK response as `$ty`.
    macro_rules! post {
        ($app:expr, $path:expr, $body:expr, $ty:ty) => {{
            let req = test::TestRequest::post()
                .uri($path)
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert!(
                resp.status().is_success(),
                "POST {} failed: {:?}",
                $path,
                resp.status()
            );
            let parsed: $ty = test::read_body_json(resp).await;
            parsed
        }};
    }

    /// POST a JSON body expecting a 5xx, returning the error token.
    macro_rules! post_err {
        ($app:expr, $path:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri($path)
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert!(
                resp.status().is_server_error(),
                "POST {} unexpectedly succeeded",
                $path
            );
            let body: freon_types::error::ErrorBody = test::read_body_json(resp).await;
            body.message
        }};
    }

    #[actix_web::test]
    async fn index_reports_version() {
        let app = test_app!();
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"]
            .as_str()
            .expect("message string")
            .starts_with("Freon Coordinator"));
    }

    #[actix_web::test]
    async fn keygen_create_join_poll_flow() {
        let app = test_app!();

        let created = post!(app, "/keygen/create", json!({"n": 3, "t": 2}), CreateKeygenResponse);
        assert!(created.group_id.starts_with("g_"));

        let first = post!(
            app,
            "/keygen/join",
            json!({"group-id": &created.group_id}),
            JoinKeygenResponse
        );
        let second = post!(
            app,
            "/keygen/join",
            json!({"group-id": &created.group_id}),
            JoinKeygenResponse
        );
        assert_eq!(first.my_party_id, 1);
        assert_eq!(second.my_party_id, 2);

        let poll = post!(
            app,
            "/keygen/poll",
            json!({"group-id": &created.group_id, "party-id": 1}),
            PollKeygenResponse
        );
        assert_eq!(poll.n, 3);
        assert_eq!(poll.t, 2);
        assert_eq!(poll.parties, vec![2]);
        assert_eq!(poll.party_id, Some(1));
    }

    #[actix_web::test]
    async fn invalid_threshold_is_tagged() {
        let app = test_app!();
        let token = post_err!(app, "/keygen/create", json!({"n": 2, "t": 3}));
        assert_eq!(token, "invalid-threshold");
    }

    #[actix_web::test]
    async fn keygen_send_and_fetch_preserve_order() {
        let app = test_app!();
        let created = post!(app, "/keygen/create", json!({"n": 2, "t": 2}), CreateKeygenResponse);
        let group = created.group_id;
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);

        // Party 1 posts a payload; the response tail includes its own echo.
        let sent = post!(
            app,
            "/keygen/send",
            json!({"group-id": &group, "party-id": 1, "message": "aa01", "last-seen": 0}),
            MessageResponse
        );
        assert_eq!(sent.messages, vec!["aa01"]);
        assert!(sent.last_seen > 0);

        let _ = post!(
            app,
            "/keygen/send",
            json!({"group-id": &group, "party-id": 2, "message": "bb02", "last-seen": 0}),
            MessageResponse
        );

        let fetched = post!(
            app,
            "/keygen/get-messages",
            json!({"group-id": &group, "party-id": 1, "message": "", "last-seen": 0}),
            MessageResponse
        );
        assert_eq!(fetched.messages, vec!["aa01", "bb02"]);

        let tail = post!(
            app,
            "/keygen/get-messages",
            json!({"group-id": &group, "party-id": 1, "message": "", "last-seen": sent.last_seen}),
            MessageResponse
        );
        assert_eq!(tail.messages, vec!["bb02"]);

        // An empty tail leaves last-seen where the request put it.
        let quiet = post!(
            app,
            "/keygen/get-messages",
            json!({"group-id": &group, "party-id": 1, "message": "", "last-seen": tail.last_seen}),
            MessageResponse
        );
        assert!(quiet.messages.is_empty());
        assert_eq!(quiet.last_seen, tail.last_seen);
    }

    #[actix_web::test]
    async fn keygen_finalize_is_once_only() {
        let app = test_app!();
        let created = post!(app, "/keygen/create", json!({"n": 2, "t": 2}), CreateKeygenResponse);
        let group = created.group_id;
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);

        post!(
            app,
            "/keygen/finalize",
            json!({"group-id": &group, "party-id": 1, "public-key": "ab"}),
            StatusResponse
        );
        let token = post_err!(
            app,
            "/keygen/finalize",
            json!({"group-id": &group, "party-id": 1, "public-key": "cd"})
        );
        assert_eq!(token, "already-finalized");
    }

    #[actix_web::test]
    async fn sign_join_rejects_wrong_hash() {
        let app = test_app!();
        let created = post!(app, "/keygen/create", json!({"n": 2, "t": 2}), CreateKeygenResponse);
        let group = created.group_id;
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);

        let ceremony = post!(
            app,
            "/sign/create",
            json!({"group-id": &group, "hash": "feed", "openssh": true, "openssh-namespace": "file"}),
            CreateSignResponse
        );

        let token = post_err!(
            app,
            "/sign/join",
            json!({"ceremony-id": &ceremony.ceremony_id, "hash": "0000", "party-id": 1})
        );
        assert_eq!(token, "hash-mismatch");

        let joined = post!(
            app,
            "/sign/join",
            json!({"ceremony-id": &ceremony.ceremony_id, "hash": "feed", "party-id": 1}),
            JoinSignResponse
        );
        assert!(joined.status);
        assert!(joined.openssh);
        assert_eq!(joined.openssh_namespace, "file");
    }

    #[actix_web::test]
    async fn sign_lifecycle_finalize_get_terminate() {
        let app = test_app!();
        let created = post!(app, "/keygen/create", json!({"n": 2, "t": 2}), CreateKeygenResponse);
        let group = created.group_id;
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);

        let ceremony = post!(
            app,
            "/sign/create",
            json!({"group-id": &group, "hash": "feed", "openssh": false, "openssh-namespace": ""}),
            CreateSignResponse
        );
        let id = ceremony.ceremony_id;

        let token = post_err!(app, "/sign/get", json!({"ceremony-id": &id}));
        assert_eq!(token, "not-yet-signed");

        post!(
            app,
            "/sign/finalize",
            json!({"ceremony-id": &id, "party-id": 1, "signature": "cafe"}),
            StatusResponse
        );
        let fetched = post!(app, "/sign/get", json!({"ceremony-id": &id}), GetSignatureResponse);
        assert_eq!(fetched.signature, "cafe");

        let token = post_err!(
            app,
            "/sign/finalize",
            json!({"ceremony-id": &id, "party-id": 1, "signature": "beef"})
        );
        assert_eq!(token, "ceremony-closed");

        // A finalized ceremony no longer shows in the lobby list.
        let listed = post!(app, "/sign/list", json!({"group-id": &group}), ListSignResponse);
        assert!(listed.ceremonies.is_empty());

        // Terminate after finalize is still a success; unknown ids are not.
        post!(app, "/terminate", json!({"ceremony-id": &id}), StatusResponse);
        let token = post_err!(app, "/terminate", json!({"ceremony-id": "c_missing"}));
        assert_eq!(token, "unknown-ceremony");
    }

    #[actix_web::test]
    async fn closed_ceremony_rejects_messages() {
        let app = test_app!();
        let created = post!(app, "/keygen/create", json!({"n": 2, "t": 2}), CreateKeygenResponse);
        let group = created.group_id;
        post!(app, "/keygen/join", json!({"group-id": &group}), JoinKeygenResponse);
        let ceremony = post!(
            app,
            "/sign/create",
            json!({"group-id": &group, "hash": "feed", "openssh": false, "openssh-namespace": ""}),
            CreateSignResponse
        );

        post!(
            app,
            "/terminate",
            json!({"ceremony-id": &ceremony.ceremony_id}),
            StatusResponse
        );
        let token = post_err!(
            app,
            "/sign/send",
            json!({
                "ceremony-id": &ceremony.ceremony_id,
                "party-id": 1,
                "message": "aa",
                "last-seen": 0
            })
        );
        assert_eq!(token, "ceremony-closed");
    }
}
