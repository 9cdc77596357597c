use crate::models::{ChatMessage, Preferences, RecipeDetail, Role};
use serde_json::json;
use thiserror::Error;
use serde::Deserialize;
use reqwest::Client;
use tracing::{info, error};

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Format error: {0}")] Format(String),
}

const COOKING_ASSISTANT: &str = "You are a cooking assistant.";

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        let base_url = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        Self::with_config(api_key, base_url, model)
    }

    pub fn with_config(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    async fn chat_completion(&self, payload: serde_json::Value) -> Result<ResponseMessage, OpenAiError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OpenAiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| OpenAiError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API error response: {}", response_text);
            return Err(OpenAiError::Http(format!("status={} body={}", status, response_text)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| OpenAiError::Format(format!("unexpected response shape: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| OpenAiError::Format("no choices in response".into()))
    }

    /// Ask for five dish names matching the items and preferences, returned as an
    /// ordered list with the numbering stripped.
    pub async fn suggest_recipes(
        &self,
        items: &[String],
        preferences: &Preferences,
    ) -> Result<Vec<String>, OpenAiError> {
        if self.api_key == "DEMO_KEY" {
            info!("Using demo mode - returning canned suggestions");
            return Ok(demo_suggestions());
        }

        let prompt = build_suggestion_prompt(items, preferences);
        info!("🍳 Requesting recipe suggestions for {} items", items.len());

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": COOKING_ASSISTANT},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": 150,
            "temperature": 0.7
        });

        let message = self.chat_completion(payload).await?;
        let text = message
            .content
            .ok_or_else(|| OpenAiError::Format("no text content in response".into()))?;

        let suggestions = parse_numbered_list(&text);
        if suggestions.is_empty() {
            return Err(OpenAiError::Format("no recipe names in response".into()));
        }
        info!("✅ Got {} suggestions", suggestions.len());
        Ok(suggestions)
    }

    /// Fetch a structured recipe through the schema-constrained tool channel,
    /// falling back to parsing plain text content as JSON when the service
    /// answers without a tool call.
    pub async fn recipe_detail(
        &self,
        recipe_name: &str,
        highlight_items: &[String],
    ) -> Result<RecipeDetail, OpenAiError> {
        if self.api_key == "DEMO_KEY" {
            info!("Using demo mode - returning canned recipe detail");
            return Ok(demo_recipe_detail(recipe_name));
        }

        let prompt = build_detail_prompt(recipe_name, highlight_items);
        info!("🍳 Requesting recipe detail for '{}'", recipe_name);

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": COOKING_ASSISTANT},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": 700,
            "temperature": 0.7,
            "tools": [{
                "type": "function",
                "function": {
                    "name": "format_recipe_response",
                    "description": "Formats the recipe response as JSON",
                    "parameters": recipe_schema()
                }
            }],
            "tool_choice": {"type": "function", "function": {"name": "format_recipe_response"}}
        });

        let message = self.chat_completion(payload).await?;
        let raw = extract_recipe_json(&message)?;

        let detail: RecipeDetail = serde_json::from_str(&raw)
            .map_err(|e| OpenAiError::Format(format!("invalid recipe JSON: {}", e)))?;
        info!("✅ Recipe detail parsed: {} steps, difficulty {:?}", detail.instructions.len(), detail.difficulty_level);
        Ok(detail)
    }

    /// One guided-cooking chat turn: the full transcript plus a transient system
    /// message carrying the current instruction. The guidance message is built
    /// fresh per call and never stored in the transcript.
    pub async fn chat_reply(
        &self,
        history: &[ChatMessage],
        current_instruction: &str,
    ) -> Result<String, OpenAiError> {
        if self.api_key == "DEMO_KEY" {
            info!("Using demo mode - returning canned chat reply");
            return Ok(format!(
                "Demo guidance: take your time with \"{}\" and move on when it looks right.",
                current_instruction
            ));
        }

        let guidance = build_guidance_prompt(current_instruction);
        let mut messages = vec![json!({"role": "system", "content": guidance})];
        for entry in history {
            let role = match entry.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": entry.content}));
        }

        let payload = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": 150,
            "temperature": 0.7
        });

        let message = self.chat_completion(payload).await?;
        message
            .content
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OpenAiError::Format("no text content in response".into()))
    }
}

pub fn build_suggestion_prompt(items: &[String], preferences: &Preferences) -> String {
    format!(
        "Based on the following ingredients: {}, suggest 5 recipes that match the following preferences:\n\n\
         Theme: {}\nOccasion: {}\nCuisine: {}\n\n\
         Provide only the names of the dishes as a numbered list.",
        items.join(", "),
        preferences.theme_or_default(),
        preferences.occasion_or_default(),
        preferences.cuisine_or_default(),
    )
}

pub fn build_detail_prompt(recipe_name: &str, highlight_items: &[String]) -> String {
    format!(
        "Provide a detailed recipe for \"{}\" including:\n\n\
         - Ingredients list (highlight the following ingredients if they are used: {}).\n\
         - Cooking instructions broken down into clear, manageable steps.\n\
         - Estimated cooking time.\n\
         - Difficulty level.",
        recipe_name,
        highlight_items.join(", "),
    )
}

pub fn build_guidance_prompt(current_instruction: &str) -> String {
    format!(
        "You are currently on the following step of the recipe: '{}'. \
         Provide guidance for this step, and recommendations for completing it or moving to the next step.",
        current_instruction
    )
}

fn recipe_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "ingredients": {
                "type": "array",
                "items": {"type": "string"},
                "description": "List of ingredients"
            },
            "instructions": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Step-by-step cooking instructions"
            },
            "estimated_cooking_time": {
                "type": "string",
                "description": "Estimated cooking time"
            },
            "difficulty_level": {
                "type": "string",
                "enum": ["Easy", "Medium", "Hard"],
                "description": "Difficulty level of the recipe"
            }
        },
        "required": ["ingredients", "instructions", "estimated_cooking_time", "difficulty_level"]
    })
}

/// Numbered-list to ordered-sequence normalization: one name per line, leading
/// digits, periods, closing parens and spaces stripped, blank lines dropped.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c == ' ')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn extract_recipe_json(message: &ResponseMessage) -> Result<String, OpenAiError> {
    if let Some(call) = message.tool_calls.first() {
        return Ok(call.function.arguments.clone());
    }
    // Free-text channel: some backends answer with plain content instead of a
    // tool call. The content itself must then be the recipe JSON.
    message
        .content
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| OpenAiError::Format("no tool call or text content in response".into()))
}

fn demo_suggestions() -> Vec<String> {
    vec![
        "Caprese Salad".to_string(),
        "Grilled Cheese Sandwich".to_string(),
        "Tomato Soup".to_string(),
        "Cheese Quesadilla".to_string(),
        "Garden Wrap".to_string(),
    ]
}

fn demo_recipe_detail(recipe_name: &str) -> RecipeDetail {
    RecipeDetail {
        ingredients: vec![
            "tomato".to_string(),
            "cheese".to_string(),
            "lettuce".to_string(),
        ],
        instructions: vec![
            format!("Gather everything you need for {}.", recipe_name),
            "Prepare the ingredients.".to_string(),
            "Combine and serve.".to_string(),
        ],
        estimated_cooking_time: "15 minutes".to_string(),
        difficulty_level: crate::models::Difficulty::Easy,
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ResponseMessage,
}

#[derive(Debug, Deserialize, Default)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[allow(dead_code)]
    #[serde(default)]
    name: String,
    arguments: String,
}
