//! Integration tests for the Telegram adapter against a stub Bot API server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use car_insurance_bot::channels::{
    Channel, IncomingMessage, OutgoingResponse, PhotoSource, TelegramChannel,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Requests seen by the stub, as `(method, payload)`.
type Seen = Arc<Mutex<Vec<(String, Value)>>>;

async fn record(
    State(seen): State<Seen>,
    Path(method): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.lock().unwrap().push((method.clone(), body));
    let result = match method.as_str() {
        "getFile" => json!({"file_id": "big", "file_path": "photos/file_7.jpg"}),
        "getMe" => json!({"id": 1, "username": "insurance_bot"}),
        "getUpdates" => json!([
            {"update_id": 10, "message": {
                "from": {"id": 55, "username": "driver"},
                "chat": {"id": 55},
                "text": "/start"
            }},
            {"update_id": 11, "edited_message": {"chat": {"id": 55}, "text": "x"}},
            {"update_id": 12, "message": {
                "from": {"id": 55},
                "chat": {"id": 55},
                "photo": [{"file_id": "small"}, {"file_id": "big"}]
            }}
        ]),
        _ => json!(true),
    };
    Json(json!({"ok": true, "result": result}))
}

async fn send_document(State(seen): State<Seen>, mut form: Multipart) -> Json<Value> {
    let mut fields = serde_json::Map::new();
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let text = field.text().await.unwrap();
        fields.insert(name, json!({"file_name": file_name, "text": text}));
    }
    seen.lock()
        .unwrap()
        .push(("sendDocument".into(), Value::Object(fields)));
    Json(json!({"ok": true, "result": {}}))
}

/// Start a stub Bot API on a random port; return the channel pointed at it.
async fn start_stub() -> (TelegramChannel, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/botTOKEN/sendDocument", post(send_document))
        .route("/botTOKEN/{method}", post(record))
        .route(
            "/file/botTOKEN/photos/file_7.jpg",
            get(|| async { vec![0xFFu8, 0xD8, 0xFF] }),
        )
        .with_state(Arc::clone(&seen));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let channel = TelegramChannel::new("TOKEN".into(), vec!["*".into()])
        .unwrap()
        .with_api_base(format!("http://127.0.0.1:{port}"));
    (channel, seen)
}

fn message_from_chat(chat_id: &str) -> IncomingMessage {
    IncomingMessage::new("telegram", chat_id).with_metadata(json!({"chat_id": chat_id}))
}

#[tokio::test]
async fn downloads_photo_through_get_file() {
    let (channel, seen) = start_stub().await;

    let bytes = timeout(TEST_TIMEOUT, channel.download("big"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "getFile");
    assert_eq!(seen[0].1, json!({"file_id": "big"}));
}

#[tokio::test]
async fn yes_no_reply_carries_keyboard() {
    let (channel, seen) = start_stub().await;

    channel
        .respond(&message_from_chat("55"), OutgoingResponse::yes_no("Згоден?"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let (method, body) = &seen[0];
    assert_eq!(method, "sendMessage");
    assert_eq!(body["chat_id"], "55");
    assert_eq!(body["text"], "Згоден?");
    assert_eq!(
        body["reply_markup"],
        json!({"keyboard": [[{"text": "Так"}, {"text": "Ні"}]], "resize_keyboard": true})
    );
}

#[tokio::test]
async fn plain_reply_has_no_keyboard() {
    let (channel, seen) = start_stub().await;

    channel
        .respond(&message_from_chat("55"), OutgoingResponse::text("Привіт"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].1.get("reply_markup").is_none());
}

#[tokio::test]
async fn policy_is_uploaded_as_document() {
    let (channel, seen) = start_stub().await;

    channel
        .respond(
            &message_from_chat("55"),
            OutgoingResponse::document("Поліс №111111111".as_bytes().to_vec(), "InsurancePolicy.txt"),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let (method, fields) = &seen[0];
    assert_eq!(method, "sendDocument");
    assert_eq!(fields["chat_id"]["text"], "55");
    assert_eq!(fields["document"]["file_name"], "InsurancePolicy.txt");
    assert_eq!(fields["document"]["text"], "Поліс №111111111");
}

#[tokio::test]
async fn polling_yields_text_and_photo_messages() {
    let (channel, _seen) = start_stub().await;
    let mut stream = channel.start().await.unwrap();

    let first = timeout(TEST_TIMEOUT, stream.next()).await.unwrap().unwrap();
    assert_eq!(first.user_id, "55");
    assert_eq!(first.text.as_deref(), Some("/start"));

    // The edited message is skipped.
    let second = timeout(TEST_TIMEOUT, stream.next()).await.unwrap().unwrap();
    assert_eq!(second.best_photo(), Some("big"));
}

#[tokio::test]
async fn health_check_calls_get_me() {
    let (channel, seen) = start_stub().await;
    channel.health_check().await.unwrap();
    assert_eq!(seen.lock().unwrap()[0].0, "getMe");
}

#[tokio::test]
async fn stalled_photo_download_times_out() {
    let app = Router::new()
        .route(
            "/botTOKEN/getFile",
            post(|| async {
                Json(json!({"ok": true, "result": {"file_path": "photos/slow.jpg"}}))
            }),
        )
        .route(
            "/file/botTOKEN/photos/slow.jpg",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                vec![0u8]
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let channel = TelegramChannel::new("TOKEN".into(), vec!["*".into()])
        .unwrap()
        .with_api_base(format!("http://127.0.0.1:{port}"))
        .with_request_timeout(Duration::from_millis(200));

    let err = timeout(TEST_TIMEOUT, channel.download("slow"))
        .await
        .expect("download should give up before the test timeout")
        .unwrap_err();
    assert!(err.to_string().contains("slow"), "unexpected error: {err}");
}
