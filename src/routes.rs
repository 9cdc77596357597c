use axum::{Json, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}};
use std::{collections::HashMap, sync::Arc};
use parking_lot::RwLock;
use uuid::Uuid;
use base64::Engine;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{
    parse_item_list, AcknowledgeStepRequest, ChatMessage, ChatRequest, Preferences, Role, Session,
    SelectRecipeRequest, SubmitImageRequest, SubmitItemsRequest,
};
use crate::openai::{OpenAiClient, OpenAiError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Session>>>,
    pub openai: Arc<OpenAiClient>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] Service(String),
    #[error("{0}")] Format(String),
    #[error("session not found")] NotFound,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Service(_) => "service",
            ApiError::Format(_) => "format",
            ApiError::NotFound => "not_found",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Service(_) | ApiError::Format(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"error": self.kind(), "message": self.to_string()});
        (self.status(), Json(body)).into_response()
    }
}

impl From<OpenAiError> for ApiError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::Http(msg) => ApiError::Service(msg),
            OpenAiError::Format(msg) => ApiError::Format(msg),
        }
    }
}

/// Session snapshot returned to the UI: the raw session plus the instruction
/// the cook is currently on (or the completion message).
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub current_instruction: Option<String>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        let current_instruction = session.current_instruction().map(str::to_string);
        SessionView { session, current_instruction }
    }
}

pub async fn create_session(State(state): State<AppState>) -> Json<SessionView> {
    let session = Session::new();
    tracing::info!("🆕 Created session {}", session.id);
    state.store.write().insert(session.id, session.clone());
    Json(session.into())
}

pub async fn get_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.store.read().get(&id).cloned().ok_or(ApiError::NotFound)?;
    Ok(Json(session.into()))
}

pub async fn submit_items(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SubmitItemsRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let items = parse_item_list(&body.text);
    if items.is_empty() {
        return Err(ApiError::Validation("Please enter at least one item.".into()));
    }

    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    tracing::info!("📝 Session {}: {} items submitted", id, items.len());
    session.replace_items(items);
    Ok(Json(session.clone().into()))
}

/// Placeholder recognition: real image understanding is out of scope, so any
/// decodable upload yields a fixed demonstration list.
fn recognize_items_from_image(_image_bytes: &[u8]) -> Vec<String> {
    vec!["tomato".to_string(), "cheese".to_string(), "lettuce".to_string()]
}

pub async fn submit_items_image(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SubmitImageRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(body.image_base64.trim())
        .map_err(|_| ApiError::Validation("Uploaded image is not valid base64.".into()))?;
    if image_bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded image is empty.".into()));
    }

    let items = recognize_items_from_image(&image_bytes);
    if items.is_empty() {
        return Err(ApiError::Validation(
            "No items recognized in the image. Please try again.".into(),
        ));
    }

    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    tracing::info!("🖼️ Session {}: recognized {} items from image", id, items.len());
    session.replace_items(items);
    Ok(Json(session.clone().into()))
}

pub async fn submit_preferences(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<Preferences>,
) -> Result<Json<SessionView>, ApiError> {
    let items = {
        let guard = state.store.read();
        let session = guard.get(&id).ok_or(ApiError::NotFound)?;
        if session.items.is_empty() {
            return Err(ApiError::Validation("Submit an item list first.".into()));
        }
        session.items.clone()
    };

    // Call the generation service outside the lock; nothing is committed on failure.
    let suggestions = state.openai.suggest_recipes(&items, &body).await?;

    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    session.replace_suggestions(body, suggestions);
    tracing::info!("✅ Session {}: {} suggestions stored", id, session.suggestions.len());
    Ok(Json(session.clone().into()))
}

pub async fn select_recipe(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SelectRecipeRequest>,
) -> Result<Json<SessionView>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::Validation("Recipe name must not be empty.".into()));
    }
    let items = {
        let guard = state.store.read();
        let session = guard.get(&id).ok_or(ApiError::NotFound)?;
        if session.suggestions.is_empty() {
            return Err(ApiError::Validation("Get recipe suggestions first.".into()));
        }
        session.items.clone()
    };

    let detail = state.openai.recipe_detail(&body.name, &items).await?;

    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    session.set_recipe_detail(body.name.clone(), detail);
    tracing::info!("✅ Session {}: recipe detail stored for '{}'", id, body.name);
    Ok(Json(session.clone().into()))
}

pub async fn acknowledge_step(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<AcknowledgeStepRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    let Some(detail) = session.recipe_detail.as_ref() else {
        return Err(ApiError::Validation("Select a recipe first.".into()));
    };
    if body.step_index >= detail.instructions.len() {
        return Err(ApiError::Validation(format!(
            "Step {} does not exist; the recipe has {} steps.",
            body.step_index,
            detail.instructions.len()
        )));
    }
    session.acknowledge_step(body.step_index);
    Ok(Json(session.clone().into()))
}

pub async fn chat_turn(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<SessionView>, ApiError> {
    if body.message.trim().is_empty() && !body.has_image {
        return Err(ApiError::Validation("Type a message or attach an image.".into()));
    }

    let mut content = body.message.trim().to_string();
    if body.has_image {
        // The image itself is not interpreted; the transcript only records that
        // one was attached.
        if !content.is_empty() {
            content.push(' ');
        }
        content.push_str("Uploaded an image.");
    }

    // Commit the user entry before calling out; a failed turn leaves it dangling.
    let (history, current_instruction) = {
        let mut guard = state.store.write();
        let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
        let Some(instruction) = session.current_instruction().map(str::to_string) else {
            return Err(ApiError::Validation("Select a recipe first.".into()));
        };
        session.chat_history.push(ChatMessage { role: Role::User, content });
        session.updated_at = chrono::Utc::now();
        (session.chat_history.clone(), instruction)
    };

    let reply = state.openai.chat_reply(&history, &current_instruction).await?;

    let mut guard = state.store.write();
    let session = guard.get_mut(&id).ok_or(ApiError::NotFound)?;
    session.chat_history.push(ChatMessage { role: Role::Assistant, content: reply });
    session.updated_at = chrono::Utc::now();
    Ok(Json(session.clone().into()))
}
