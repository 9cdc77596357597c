mod routes;
mod models;
mod openai;

use axum::{Router, routing::{post, get}};
use routes::{
    acknowledge_step, chat_turn, create_session, get_session, select_recipe,
    submit_items, submit_items_image, submit_preferences, AppState,
};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};

use crate::openai::OpenAiClient;

/// First few characters of the credential for the startup log. Counts chars,
/// not bytes, so multi-byte keys cannot split a character.
fn key_preview(key: &str) -> String {
    key.chars().take(10).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "DEMO_KEY".into());
    tracing::info!("Using API key: {}...", key_preview(&api_key));
    let state = AppState {
        store: Arc::default(),
        openai: Arc::new(OpenAiClient::new(api_key)),
    };

    let app = Router::new()
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session))
        .route("/api/session/:id/items", post(submit_items))
        .route("/api/session/:id/items/image", post(submit_items_image))
        .route("/api/session/:id/preferences", post(submit_preferences))
        .route("/api/session/:id/recipe", post(select_recipe))
        .route("/api/session/:id/step", post(acknowledge_step))
        .route("/api/session/:id/chat", post(chat_turn))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state);

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0,0,0,0], port));
    tracing::info!(%addr, "Starting server");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::key_preview;

    #[test]
    fn key_preview_never_splits_a_character() {
        assert_eq!(key_preview("sk-1234567890abcdef"), "sk-1234567");
        assert_eq!(key_preview("DEMO_KEY"), "DEMO_KEY");
        // 11 multi-byte chars; a byte slice at index 10 would panic here.
        assert_eq!(key_preview("秘密の鍵あいうえおかき"), "秘密の鍵あいうえおか");
    }
}
