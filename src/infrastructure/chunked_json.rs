// Chunked JSON streaming utilities
use crate::infrastructure::http_response::brotli_compress;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Create a chunked response of length-prefixed JSON frames
pub fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    // Serialize before the async block so the item itself is never held across an await
    let byte_stream = stream.then(move |msg| {
        let json = serde_json::to_vec(&msg).map_err(std::io::Error::from);
        async move { encode_frame(json?, compress).await }
    });

    // Frames are compressed individually, so no Content-Encoding on the response
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndframe+json")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// One frame: 4-byte big-endian payload length, then the (optionally brotli) JSON payload
pub async fn encode_frame(json: Vec<u8>, compress: bool) -> Result<Bytes, std::io::Error> {
    let payload = if compress {
        brotli_compress(&json).await?
    } else {
        json
    };

    let length = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "frame too large"))?;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(length);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}

/// Stream the current value of `rx` and then every later value, each
/// passed through `map`. Ends when the sender is dropped.
pub fn stream_from_watch<T, U, F>(
    mut rx: watch::Receiver<Arc<T>>,
    compress: bool,
    map: F,
) -> impl IntoResponse
where
    T: Send + Sync + 'static,
    U: Serialize + Send + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    let stream = async_stream::stream! {
        let current = map(&**rx.borrow_and_update());
        yield current;
        while rx.changed().await.is_ok() {
            let next = map(&**rx.borrow_and_update());
            yield next;
        }
    };

    match chunked_json_stream(stream, compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn split_frames(mut bytes: &[u8]) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while bytes.len() >= 4 {
            let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
            frames.push(serde_json::from_slice(&bytes[4..4 + len]).unwrap());
            bytes = &bytes[4 + len..];
        }
        assert!(bytes.is_empty());
        frames
    }

    #[tokio::test]
    async fn test_frame_is_length_prefixed() {
        let frame = encode_frame(serde_json::to_vec(&json!({ "a": 1 })).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(&frame[..4], &[0, 0, 0, 7]);
        assert_eq!(&frame[4..], br#"{"a":1}"#);
    }

    #[derive(Serialize)]
    struct Tick {
        // Cell is Send but not Sync
        n: std::cell::Cell<u32>,
    }

    #[tokio::test]
    async fn test_streams_items_that_are_not_sync() {
        let ticks = (0..3).map(|n| Tick { n: std::cell::Cell::new(n) });
        let response = chunked_json_stream(futures::stream::iter(ticks), false).unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let frames = split_frames(&body);
        assert_eq!(frames, vec![json!({ "n": 0 }), json!({ "n": 1 }), json!({ "n": 2 })]);
    }

    #[tokio::test]
    async fn test_compressed_frames_decode() {
        let response = chunked_json_stream(futures::stream::iter(vec![json!({ "a": 1 })]), true).unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let len = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize;
        assert_eq!(body.len(), 4 + len);
        assert_ne!(&body[4..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_watch_stream_emits_every_value() {
        let (tx, rx) = watch::channel(Arc::new(json!({ "n": 0 })));
        let response = stream_from_watch(rx, false, |v: &serde_json::Value| v.clone()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let producer = tokio::spawn(async move {
            // wait for the body to subscribe before publishing
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tx.send_replace(Arc::new(json!({ "n": 1 })));
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tx.send_replace(Arc::new(json!({ "n": 2 })));
        });

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        producer.await.unwrap();

        let frames = split_frames(&body);
        assert!(frames.len() >= 2);
        assert_eq!(frames.last(), Some(&json!({ "n": 2 })));
    }
}
