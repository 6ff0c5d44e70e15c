use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct GeneratorStubConfig {
    pub transform: TransformBehavior,
    pub expected_api_key: Option<String>,
}

impl Default for GeneratorStubConfig {
    fn default() -> Self {
        Self {
            transform: TransformBehavior::Valid,
            expected_api_key: None,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum TransformBehavior {
    Valid,
    Fenced,
    MissingFlashcards,
    ServerError,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

pub struct GeneratorStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Samples served by `/api/tts`, as signed 16-bit values.
#[allow(dead_code)]
pub const TTS_SAMPLES: [i16; 4] = [0, 16384, -16384, i16::MIN];

impl GeneratorStub {
    pub fn spawn(config: GeneratorStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start generator stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/api");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                if request.method() != &tiny_http::Method::Post {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                if let Some(expected) = config.expected_api_key.as_deref() {
                    let authorized = request.headers().iter().any(|h| {
                        h.field.equiv("Authorization")
                            && h.value.as_str() == format!("Bearer {expected}")
                    });
                    if !authorized {
                        let _ = request.respond(json_response(
                            401,
                            serde_json::json!({ "error": { "message": "invalid api key" } }),
                        ));
                        continue;
                    }
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let path = request.url().to_string();
                recorded.lock().expect("lock requests").push(RecordedRequest {
                    path: path.clone(),
                    body: parsed.clone(),
                });

                let response = match path.as_str() {
                    "/api/transform" => transform_response(&parsed, config.transform),
                    "/api/tts" => tts_response(&parsed),
                    "/api/chat" => chat_response(&parsed),
                    "/api/feedback" => feedback_response(&parsed),
                    _ => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .expect("lock requests")
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.body.clone())
            .collect()
    }
}

impl Drop for GeneratorStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

type StubResponse = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

fn json_response(status: u16, value: Value) -> StubResponse {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(value.to_string())
        .with_status_code(status)
        .with_header(header)
}

/// The document every successful `/api/transform` returns.
#[allow(dead_code)]
pub fn sample_document() -> Value {
    serde_json::json!({
        "title": "Photosynthesis",
        "blocks": [
            { "id": "b1", "type": "heading", "content": "# Photosynthesis" },
            { "id": "b2", "type": "text", "content": "Plants make **sugar** from light.", "highlight": "sugar" },
            { "id": "b3", "type": "math", "content": "$6CO_2 + 6H_2O$", "steps": ["Count carbon", "Count oxygen"] }
        ],
        "slides": [
            { "id": "s1", "content": "Light in, sugar out", "visualCue": "☀️", "speakerNotes": "Plants eat light." }
        ],
        "audioScript": "Photosynthesis is how plants turn sunlight into food.",
        "activities": [
            { "id": "a1", "type": "quiz", "question": "How many CO2 molecules?", "options": ["2", "4", "6"], "correctAnswer": "6", "correctAnswerIndex": 2 },
            { "id": "a2", "type": "checklist", "question": "Name the inputs", "options": ["light", "water", "CO2"] }
        ],
        "mindmap": [
            { "id": "m1", "label": "Photosynthesis" },
            { "id": "m2", "parentId": "m1", "label": "Inputs", "description": "light, water, CO2" },
            { "id": "m3", "parentId": "m1", "label": "Outputs" },
            { "id": "m4", "parentId": "m2", "label": "Sunlight" },
            { "id": "m5", "parentId": "nowhere", "label": "Stray" }
        ],
        "flashcards": [
            { "id": "f1", "front": "Chlorophyll", "back": "Green pigment", "mnemonic": "Chloro = green" }
        ]
    })
}

fn transform_response(request: &Value, behavior: TransformBehavior) -> StubResponse {
    let has_payload = request
        .get("dataBase64")
        .and_then(Value::as_str)
        .is_some_and(|data| !data.is_empty());
    if !has_payload || request.get("profile").and_then(Value::as_str).is_none() {
        return json_response(400, serde_json::json!({ "error": "missing dataBase64 or profile" }));
    }

    match behavior {
        TransformBehavior::Valid => json_response(200, sample_document()),
        TransformBehavior::Fenced => tiny_http::Response::from_string(format!(
            "Here is your lesson:\n```json\n{}\n```",
            sample_document()
        ))
        .with_status_code(200),
        TransformBehavior::MissingFlashcards => {
            let mut document = sample_document();
            if let Some(map) = document.as_object_mut() {
                map.remove("flashcards");
            }
            json_response(200, document)
        }
        TransformBehavior::ServerError => {
            json_response(500, serde_json::json!({ "error": "model overloaded" }))
        }
    }
}

fn tts_response(request: &Value) -> StubResponse {
    if request.get("text").and_then(Value::as_str).is_none() {
        return json_response(400, serde_json::json!({ "error": "missing text" }));
    }
    let pcm = TTS_SAMPLES
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect::<Vec<_>>();
    let audio = base64::engine::general_purpose::STANDARD.encode(pcm);
    json_response(200, serde_json::json!({ "audioData": audio }))
}

fn chat_response(request: &Value) -> StubResponse {
    let message = request
        .get("newMessage")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let earlier = request
        .get("history")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or_default();
    json_response(
        200,
        serde_json::json!({ "text": format!("Echo: {message} ({earlier} earlier)") }),
    )
}

fn feedback_response(request: &Value) -> StubResponse {
    let audio = request
        .get("audioBase64")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if audio.is_empty() {
        return json_response(500, serde_json::json!({ "error": "no audio" }));
    }
    json_response(200, serde_json::json!({ "text": "Great explanation!" }))
}
