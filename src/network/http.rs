//! axum HTTP transport: open CORS, JSON envelopes, the six business
//! endpoints, and the method-not-allowed / malformed-json fallbacks.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::domain::Move;
use crate::errors::ResponseCode;
use crate::server::Server;

use super::dto::*;

fn json_envelope<T: serde::Serialize + Default>(code: ResponseCode, data: T) -> Response {
    let envelope = if code == ResponseCode::Ok {
        Envelope::ok(data)
    } else {
        Envelope { code, msg: code.description().to_string(), data }
    };
    (StatusCode::OK, Json(serde_json::to_value(&envelope).unwrap_or_default())).into_response()
}

async fn not_allowed() -> Response {
    (StatusCode::OK, "Method Not Allowed").into_response()
}

async fn options_ok() -> Response {
    StatusCode::OK.into_response()
}

async fn handle_match(
    State(server): State<Arc<Server>>,
    body: Result<Json<MatchRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(j) => j,
        Err(e) => {
            error!(error = %e, "match request malformed");
            return json_envelope(ResponseCode::BadRequestFormat, MatchResponseData::default());
        }
    };

    match server.matchmaker.clone().match_request(request.level, request.access_token).await {
        Ok(resp) => json_envelope(ResponseCode::Ok, MatchResponseData::from(resp)),
        Err(err) => json_envelope(ResponseCode::from(&err), MatchResponseData::default()),
    }
}

async fn handle_ready(
    State(server): State<Arc<Server>>,
    body: Result<Json<ReadyRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(j) => j,
        Err(_) => return json_envelope(ResponseCode::BadRequestFormat, ReadyResponseData::default()),
    };

    let operate = match Move::from_i32(request.operate) {
        Ok(m) => m,
        Err(code) => return json_envelope(code, ReadyResponseData::default()),
    };

    match server
        .matchmaker
        .ready(request.match_id, request.round, request.access_token, operate)
        .await
    {
        Ok(resp) => json_envelope(ResponseCode::Ok, ReadyResponseData::from(resp)),
        Err(err) => json_envelope(ResponseCode::from(&err), ReadyResponseData::default()),
    }
}

async fn handle_ready_status(
    State(server): State<Arc<Server>>,
    body: Result<Json<ReadyStatusRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(j) => j,
        Err(_) => return json_envelope(ResponseCode::BadRequestFormat, ReadyStatusResponseData::default()),
    };

    match server.matchmaker.ready_status(&request.match_id, &request.access_token).await {
        Ok(status) => json_envelope(ResponseCode::Ok, ReadyStatusResponseData { status: status as i32 }),
        Err(err) => json_envelope(ResponseCode::from(&err), ReadyStatusResponseData::default()),
    }
}

async fn handle_leave(
    State(server): State<Arc<Server>>,
    body: Result<Json<LeaveRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(j) => j,
        Err(_) => return json_envelope(ResponseCode::BadRequestFormat, LeaveResponseData::default()),
    };

    match server.matchmaker.leave(request.match_id, request.access_token).await {
        Ok(()) => json_envelope(ResponseCode::Ok, LeaveResponseData::default()),
        Err(err) => json_envelope(ResponseCode::from(&err), LeaveResponseData::default()),
    }
}

async fn handle_ranking(
    State(server): State<Arc<Server>>,
    body: Result<Json<RankingRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if body.is_err() {
        return json_envelope(ResponseCode::BadRequestFormat, RankingResponseData::default());
    }

    match server.matchmaker.ranking().await {
        Ok(rows) => json_envelope(
            ResponseCode::Ok,
            RankingResponseData {
                results: rows.into_iter().map(Into::into).collect(),
            },
        ),
        Err(err) => json_envelope(ResponseCode::from(&err), RankingResponseData::default()),
    }
}

async fn handle_online_number(State(server): State<Arc<Server>>) -> Response {
    let resp = server.matchmaker.online_number();
    json_envelope(ResponseCode::Ok, OnlineNumberResponseData::from(resp))
}

/// Build the full router: business endpoints, open CORS, OPTIONS -> 200, and
/// GET on a business path returning the plain-text 405 the original server
/// returned (rather than axum's default empty body).
pub fn build_router(server: Arc<Server>) -> Router {
    Router::new()
        .route(
            "/fingerplay/v1/match",
            post(handle_match).get(not_allowed).options(options_ok),
        )
        .route(
            "/fingerplay/v1/ready",
            post(handle_ready).get(not_allowed).options(options_ok),
        )
        .route(
            "/fingerplay/v1/ready/status",
            post(handle_ready_status).get(not_allowed).options(options_ok),
        )
        .route(
            "/fingerplay/v1/leave",
            post(handle_leave).get(not_allowed).options(options_ok),
        )
        .route(
            "/fingerplay/v1/ranking",
            post(handle_ranking).get(not_allowed).options(options_ok),
        )
        .route(
            "/fingerplay/v1/online/number",
            post(handle_online_number).get(not_allowed).options(options_ok),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::{FakeAccountService, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_server() -> Arc<Server> {
        let config = Arc::new(Config::dev_default());
        let accounts = Arc::new(FakeAccountService::new(config.robot_uid));
        let store = Arc::new(MemoryStore::new());
        store.seed_bonus_pool(100000.0);
        Server::build_with(config, accounts, store)
    }

    #[tokio::test]
    async fn malformed_json_yields_bad_request_format() {
        let server = test_server().await;
        let router = build_router(server);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/fingerplay/v1/match")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["code"], ResponseCode::BadRequestFormat.as_i32());
    }

    #[tokio::test]
    async fn get_on_business_endpoint_is_not_allowed() {
        let server = test_server().await;
        let router = build_router(server);
        let response = router
            .oneshot(Request::builder().method("GET").uri("/fingerplay/v1/match").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Method Not Allowed");
    }

    #[tokio::test]
    async fn options_on_business_endpoint_is_ok() {
        let server = test_server().await;
        let router = build_router(server);
        let response = router
            .oneshot(Request::builder().method("OPTIONS").uri("/fingerplay/v1/match").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
