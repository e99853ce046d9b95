use crate::config::prompt::PromptTemplate;
use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatRequest, ChatResponse, ErrorResponse };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

/// What the relay answers on any provider failure.
pub const RELAY_ERROR_MESSAGE: &str = "Failed to process request";

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ChatClient>,
    pub template: Arc<PromptTemplate>,
}

impl AppState {
    pub fn new(client: Arc<dyn ChatClient>, template: PromptTemplate) -> Self {
        Self { client, template: Arc::new(template) }
    }
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

pub async fn start_http_server(
    port: u16,
    state: AppState,
    tls: Option<TlsPaths>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", port).parse::<SocketAddr>()?;
    let app = router(state);

    if let Some(tls) = tls {
        info!(
            "TLS enabled. Loading certificate from '{}' and key from '{}'",
            tls.cert_path,
            tls.key_path
        );
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &tls.cert_path,
            &tls.key_path
        ).await?;
        info!("Server running on port {} (https://{})", port, addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Server running on port {} (http://{})", port, addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!("Rejected /api/chat body: {}", rejection.body_text());
            let body = ErrorResponse { error: rejection.body_text() };
            return (rejection.status(), Json(body)).into_response();
        }
    };

    let prompt = state.template.wrap(&req.input);
    match state.client.generate(&prompt).await {
        Ok(response) => (StatusCode::OK, Json(ChatResponse { response })).into_response(),
        Err(e) => {
            error!("Error: {}", e);
            let body = ErrorResponse { error: RELAY_ERROR_MESSAGE.to_string() };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::DEFAULT_SYSTEM_INSTRUCTION;
    use crate::llm::chat::huggingface::HuggingFaceChatClient;
    use crate::llm::chat::testing::{ spawn_fake_provider, ScriptedClient };
    use crate::llm::SamplingParams;
    use axum::body::{ to_bytes, Body };
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn relays_wrapped_prompt_and_returns_text() {
        let client = Arc::new(ScriptedClient::replying("Resolution 1973 authorizes..."));
        let app = router(AppState::new(client.clone(), PromptTemplate::default()));

        let resp = app
            .oneshot(chat_request(r#"{"input": "What is Resolution 1973?"}"#)).await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({ "response": "Resolution 1973 authorizes..." }));

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].system, DEFAULT_SYSTEM_INSTRUCTION);
        assert_eq!(prompts[0].user, "What is Resolution 1973?");
    }

    #[tokio::test]
    async fn provider_failure_is_generic_500() {
        let client = Arc::new(ScriptedClient::failing());
        let app = router(AppState::new(client, PromptTemplate::default()));

        let resp = app.oneshot(chat_request(r#"{"input": "hi"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, json!({ "error": "Failed to process request" }));
    }

    #[tokio::test]
    async fn invalid_body_makes_no_outbound_request() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let app = router(AppState::new(client.clone(), PromptTemplate::default()));

        let resp = app.oneshot(chat_request(r#"{"input": 1}"#)).await.unwrap();
        assert!(resp.status().is_client_error());
        assert!(json_body(resp).await["error"].is_string());
        assert!(client.prompts().is_empty());
    }

    #[tokio::test]
    async fn input_is_forwarded_without_validation() {
        let client = Arc::new(ScriptedClient::replying("Please state your question."));
        let app = router(AppState::new(client.clone(), PromptTemplate::default()));

        let resp = app.oneshot(chat_request(r#"{"input": ""}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(client.prompts().len(), 1);
        assert_eq!(client.prompts()[0].user, "");
    }

    #[tokio::test]
    async fn body_without_input_is_forwarded_as_empty() {
        let client = Arc::new(ScriptedClient::replying("Please state your question."));
        let app = router(AppState::new(client.clone(), PromptTemplate::default()));

        let resp = app.oneshot(chat_request(r#"{"text": "hello"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(client.prompts().len(), 1);
        assert_eq!(client.prompts()[0].user, "");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let app = router(AppState::new(client, PromptTemplate::default()));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn end_to_end_through_huggingface_sends_one_templated_request() {
        let provider = spawn_fake_provider(
            StatusCode::OK,
            json!([{ "generated_text": "Resolution 1973 authorizes..." }])
        ).await;
        let hf = HuggingFaceChatClient::new(
            "hf_token".to_string(),
            None,
            Some(provider.base_url.clone()),
            SamplingParams::default()
        ).unwrap();
        let app = router(AppState::new(Arc::new(hf), PromptTemplate::default()));

        let resp = app
            .oneshot(chat_request(r#"{"input": "What is Resolution 1973?"}"#)).await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["response"], "Resolution 1973 authorizes...");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body["inputs"],
            format!("{}\n\nUser: What is Resolution 1973?", DEFAULT_SYSTEM_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn end_to_end_provider_500_is_generic_500() {
        let provider = spawn_fake_provider(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Model is overloaded" })
        ).await;
        let hf = HuggingFaceChatClient::new(
            "hf_token".to_string(),
            None,
            Some(provider.base_url.clone()),
            SamplingParams::default()
        ).unwrap();
        let app = router(AppState::new(Arc::new(hf), PromptTemplate::default()));

        let resp = app.oneshot(chat_request(r#"{"input": "hi"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, json!({ "error": RELAY_ERROR_MESSAGE }));
        assert_eq!(provider.requests().len(), 1);
    }
}
