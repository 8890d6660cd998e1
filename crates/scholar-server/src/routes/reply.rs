use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use scholar::models::message::Message;
use scholar::protocol::{encode_record, StreamRecord, STREAM_HEADER, STREAM_VERSION};
use serde::Deserialize;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

/// Response body that frames pipeline records as they arrive
pub struct RecordStream {
    rx: ReceiverStream<StreamRecord>,
}

impl RecordStream {
    fn new(rx: ReceiverStream<StreamRecord>) -> Self {
        Self { rx }
    }
}

impl Stream for RecordStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|record| record.map(|record| Ok(Bytes::from(encode_record(&record)))))
    }
}

impl IntoResponse for RecordStream {
    fn into_response(self) -> axum::response::Response {
        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::HeaderName::from_static(STREAM_HEADER), STREAM_VERSION),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}

async fn handler(
    State(state): State<AppState>,
    Json(mut request): Json<ChatRequest>,
) -> Result<RecordStream, StatusCode> {
    // Only the latest message drives a run; earlier turns are display history
    let Some(submission) = request.messages.pop() else {
        tracing::warn!("Rejecting chat request without messages");
        return Err(StatusCode::BAD_REQUEST);
    };

    let records = state.pipeline.clone().spawn(submission);
    Ok(RecordStream::new(records))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
