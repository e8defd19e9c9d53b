//! Turns a [`StreamPlan`] into an HTTP response.
//!
//! Headers are fully decided before the body starts. Once the body is
//! streaming, a store failure can only abort the connection: the stream
//! yields an error and hyper resets it instead of sending a truncated body
//! that looks complete.

use crate::{
    models::media::VIDEO_MP4,
    services::{
        object_store::ByteStream,
        range::{content_range, unsatisfied_content_range},
        streaming_service::StreamPlan,
    },
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use futures::Stream;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tracing::{debug, warn};

pub fn plan_response(plan: StreamPlan) -> Response {
    match plan {
        StreamPlan::Whole { key, size, body } => {
            let mut response = Response::new(tracked_body(body, key, size));
            *response.status_mut() = StatusCode::OK;
            set_media_headers(response.headers_mut(), size);
            response
        }
        StreamPlan::Partial {
            key,
            start,
            end,
            size,
            body,
        } => {
            let len = end - start + 1;
            let mut response = Response::new(tracked_body(body, key, len));
            *response.status_mut() = StatusCode::PARTIAL_CONTENT;
            let headers = response.headers_mut();
            set_media_headers(headers, len);
            insert_header(headers, header::CONTENT_RANGE, &content_range(start, end, size));
            response
        }
        StreamPlan::Unsatisfiable { size } => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
            let headers = response.headers_mut();
            insert_header(headers, header::CONTENT_RANGE, &unsatisfied_content_range(size));
            headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            response
        }
    }
}

fn set_media_headers(headers: &mut HeaderMap, content_length: u64) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(VIDEO_MP4));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
}

fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn tracked_body(inner: ByteStream, key: String, expected: u64) -> Body {
    Body::from_stream(TrackedStream {
        inner,
        key,
        expected,
        sent: 0,
        finished: false,
    })
}

/// Counts delivered bytes so short reads turn into an aborted response and
/// abandoned responses show up in the logs.
struct TrackedStream {
    inner: ByteStream,
    key: String,
    expected: u64,
    sent: u64,
    finished: bool,
}

impl Stream for TrackedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finished = true;
                warn!(
                    key = %this.key,
                    sent = this.sent,
                    expected = this.expected,
                    error = %err,
                    "object store read failed mid-stream; aborting response"
                );
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                if this.sent < this.expected {
                    warn!(
                        key = %this.key,
                        sent = this.sent,
                        expected = this.expected,
                        "object store ended early; aborting response"
                    );
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "object shorter than advertised",
                    ))));
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        if !self.finished && self.sent < self.expected {
            debug!(
                key = %self.key,
                sent = self.sent,
                expected = self.expected,
                "client went away mid-stream; stopped reading"
            );
        }
    }
}
