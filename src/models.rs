use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitItemsRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitImageRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Option<String>, // e.g., "Quick meals", or free text
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
}

impl Preferences {
    pub fn theme_or_default(&self) -> &str {
        self.theme.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("No preference")
    }

    pub fn occasion_or_default(&self) -> &str {
        self.occasion.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("No preference")
    }

    pub fn cuisine_or_default(&self) -> &str {
        self.cuisine.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("No preference")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectRecipeRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AcknowledgeStepRequest {
    pub step_index: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub has_image: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeDetail {
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub estimated_cooking_time: String,
    pub difficulty_level: Difficulty,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

pub const WALKTHROUGH_COMPLETE: &str = "You have completed all the steps!";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub id: Uuid,
    pub items: Vec<String>,
    pub preferences: Preferences,
    pub suggestions: Vec<String>,
    pub selected_recipe: Option<String>,
    pub recipe_detail: Option<RecipeDetail>,
    pub chat_history: Vec<ChatMessage>,
    pub current_step: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            items: Vec::new(),
            preferences: Preferences::default(),
            suggestions: Vec::new(),
            selected_recipe: None,
            recipe_detail: None,
            chat_history: Vec::new(),
            current_step: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the item list wholesale and reset every downstream entity.
    pub fn replace_items(&mut self, items: Vec<String>) {
        self.items = items;
        self.preferences = Preferences::default();
        self.suggestions.clear();
        self.selected_recipe = None;
        self.recipe_detail = None;
        self.chat_history.clear();
        self.current_step = 0;
        self.updated_at = Utc::now();
    }

    /// Commit a freshly generated suggestion list together with the preferences
    /// that produced it. Any walkthrough built from the previous suggestions is
    /// stale, so it is cleared as well.
    pub fn replace_suggestions(&mut self, preferences: Preferences, suggestions: Vec<String>) {
        self.preferences = preferences;
        self.suggestions = suggestions;
        self.selected_recipe = None;
        self.recipe_detail = None;
        self.chat_history.clear();
        self.current_step = 0;
        self.updated_at = Utc::now();
    }

    /// Store a freshly generated recipe detail and start the walkthrough over.
    pub fn set_recipe_detail(&mut self, name: String, detail: RecipeDetail) {
        self.selected_recipe = Some(name);
        self.recipe_detail = Some(detail);
        self.chat_history.clear();
        self.current_step = 0;
        self.updated_at = Utc::now();
    }

    /// Mark step `index` as done. The cursor only ever moves forward; acknowledging
    /// an earlier step again leaves it where it is.
    pub fn acknowledge_step(&mut self, index: usize) {
        self.current_step = self.current_step.max(index + 1);
        self.updated_at = Utc::now();
    }

    /// The instruction the cook is currently on, or the completion message once
    /// the cursor has passed the last step.
    pub fn current_instruction(&self) -> Option<&str> {
        let detail = self.recipe_detail.as_ref()?;
        Some(
            detail
                .instructions
                .get(self.current_step)
                .map(String::as_str)
                .unwrap_or(WALKTHROUGH_COMPLETE),
        )
    }
}

/// Comma-split an item list, trimming whitespace and dropping empty tokens.
pub fn parse_item_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detail(steps: &[&str]) -> RecipeDetail {
        RecipeDetail {
            ingredients: vec!["tomato".into(), "cheese".into()],
            instructions: steps.iter().map(|s| s.to_string()).collect(),
            estimated_cooking_time: "20 minutes".into(),
            difficulty_level: Difficulty::Easy,
        }
    }

    #[test]
    fn item_list_trims_and_drops_empties() {
        assert_eq!(
            parse_item_list("tomato, , cheese ,lettuce"),
            vec!["tomato", "cheese", "lettuce"]
        );
    }

    #[test]
    fn item_list_keeps_duplicates_and_order() {
        assert_eq!(
            parse_item_list(" egg,egg , milk"),
            vec!["egg", "egg", "milk"]
        );
        assert!(parse_item_list(" , ,, ").is_empty());
    }

    #[test]
    fn replace_items_resets_downstream_state() {
        let mut session = Session::new();
        session.replace_items(vec!["rice".into()]);
        session.preferences.cuisine = Some("Korean".into());
        session.suggestions = vec!["Kimchi Fried Rice".into()];
        session.set_recipe_detail("Kimchi Fried Rice".into(), detail(&["Chop", "Fry"]));
        session.acknowledge_step(0);
        session.chat_history.push(ChatMessage {
            role: Role::User,
            content: "how small should I chop?".into(),
        });

        session.replace_items(vec!["pasta".into(), "basil".into()]);

        assert_eq!(session.items, vec!["pasta", "basil"]);
        assert!(session.suggestions.is_empty());
        assert!(session.selected_recipe.is_none());
        assert!(session.recipe_detail.is_none());
        assert!(session.chat_history.is_empty());
        assert_eq!(session.current_step, 0);
        assert!(session.preferences.theme.is_none());
        assert!(session.preferences.cuisine.is_none());
    }

    #[test]
    fn replacing_suggestions_clears_stale_walkthrough() {
        let mut session = Session::new();
        session.replace_items(vec!["tomato".into()]);
        session.replace_suggestions(
            Preferences { theme: None, occasion: None, cuisine: Some("Italian".into()) },
            vec!["Caprese Salad".into()],
        );
        session.set_recipe_detail("Caprese Salad".into(), detail(&["Slice", "Layer"]));
        session.acknowledge_step(0);
        session.chat_history.push(ChatMessage {
            role: Role::User,
            content: "how thick should the slices be?".into(),
        });

        session.replace_suggestions(
            Preferences { theme: Some("Quick meals".into()), occasion: None, cuisine: None },
            vec!["Tomato Soup".into(), "Bruschetta".into()],
        );

        assert_eq!(session.suggestions, vec!["Tomato Soup", "Bruschetta"]);
        assert_eq!(session.preferences.theme.as_deref(), Some("Quick meals"));
        assert!(session.selected_recipe.is_none());
        assert!(session.recipe_detail.is_none());
        assert!(session.chat_history.is_empty());
        assert_eq!(session.current_step, 0);
    }

    #[test]
    fn step_cursor_is_monotonic() {
        let mut session = Session::new();
        session.set_recipe_detail("Soup".into(), detail(&["a", "b", "c", "d"]));

        session.acknowledge_step(2);
        assert_eq!(session.current_step, 3);
        // Acknowledging an earlier step never moves the cursor back.
        session.acknowledge_step(0);
        assert_eq!(session.current_step, 3);
        session.acknowledge_step(3);
        assert_eq!(session.current_step, 4);
    }

    #[test]
    fn walkthrough_reports_completion_at_end() {
        let mut session = Session::new();
        assert_eq!(session.current_instruction(), None);

        session.set_recipe_detail("Soup".into(), detail(&["Boil water", "Add salt"]));
        assert_eq!(session.current_instruction(), Some("Boil water"));

        session.acknowledge_step(0);
        assert_eq!(session.current_instruction(), Some("Add salt"));

        session.acknowledge_step(1);
        assert_eq!(session.current_step, 2);
        assert_eq!(session.current_instruction(), Some(WALKTHROUGH_COMPLETE));
    }

    #[test]
    fn selecting_a_recipe_restarts_the_walkthrough() {
        let mut session = Session::new();
        session.set_recipe_detail("Soup".into(), detail(&["a", "b"]));
        session.acknowledge_step(1);
        session.chat_history.push(ChatMessage {
            role: Role::Assistant,
            content: "Nice work!".into(),
        });

        session.set_recipe_detail("Salad".into(), detail(&["Toss"]));
        assert_eq!(session.selected_recipe.as_deref(), Some("Salad"));
        assert_eq!(session.current_step, 0);
        assert!(session.chat_history.is_empty());
    }

    #[test]
    fn preferences_fall_back_to_no_preference() {
        let prefs = Preferences {
            theme: Some("  ".into()),
            occasion: None,
            cuisine: Some("Italian".into()),
        };
        assert_eq!(prefs.theme_or_default(), "No preference");
        assert_eq!(prefs.occasion_or_default(), "No preference");
        assert_eq!(prefs.cuisine_or_default(), "Italian");
    }

    #[test]
    fn recipe_detail_uses_exact_wire_field_names() {
        let json = r#"{
            "ingredients": ["tomato"],
            "instructions": ["Slice the tomato"],
            "estimated_cooking_time": "5 minutes",
            "difficulty_level": "Medium"
        }"#;
        let parsed: RecipeDetail = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.difficulty_level, Difficulty::Medium);
        assert_eq!(parsed.instructions, vec!["Slice the tomato"]);
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let json = r#"{
            "ingredients": [],
            "instructions": [],
            "estimated_cooking_time": "5 minutes",
            "difficulty_level": "Impossible"
        }"#;
        assert!(serde_json::from_str::<RecipeDetail>(json).is_err());
    }
}
