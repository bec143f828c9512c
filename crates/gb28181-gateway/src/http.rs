//! The admin trigger surface (SPEC_FULL.md §6): a single route wired for
//! completeness, everything else about an HTTP admin API is out of scope.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use gb_session::{ChannelDirectory, Orchestrator, TalkRequest};
use serde::Serialize;
use serde_json::json;

pub fn router<C: ChannelDirectory + 'static>(orchestrator: Arc<Orchestrator<C>>) -> Router {
    Router::new()
        .route("/channels/:id/start_talk", post(start_talk::<C>))
        .with_state(orchestrator)
}

#[derive(Serialize)]
struct StreamResponse {
    stream_id: String,
    http_url: String,
    rtmp_url: String,
    rtsp_url: String,
    ws_flv_url: String,
}

async fn start_talk<C: ChannelDirectory + 'static>(
    State(orchestrator): State<Arc<Orchestrator<C>>>,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    let request = TalkRequest {
        channel_id,
        start: 0,
        end: 0,
        session_type: 0,
    };

    match orchestrator.sip_talk(request).await {
        Ok(stream) => {
            let body = StreamResponse {
                stream_id: stream.stream_id,
                http_url: stream.http_url,
                rtmp_url: stream.rtmp_url,
                rtsp_url: stream.rtsp_url,
                ws_flv_url: stream.ws_flv_url,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            let status = match &e {
                gb_infra::Error::ChannelNotFound(_) => StatusCode::NOT_FOUND,
                gb_infra::Error::DeviceOffline => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}
