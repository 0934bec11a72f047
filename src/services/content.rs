use crate::core::story::{Audience, StoryConfig};
use crate::services::error::{LookupError, ServiceError};
use crate::services::llm::{ChatRequest, LlmClient};
use crate::utils::text::{clean_response_text, strip_code_blocks};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const STORY_SYSTEM_PROMPT: &str = "You are a creative storytelling AI that generates engaging, well-structured stories. \
Always respond with properly formatted content. Never include any internal reasoning, thinking, or meta-commentary \
in your responses. Only provide the direct output that should be shown to the user.";

const DICTIONARY_SYSTEM_PROMPT: &str =
    "You are a helpful dictionary assistant. Provide clear, simple definitions and examples.";

const STORY_TEMPERATURE: f32 = 0.8;
const STORY_MAX_TOKENS: u32 = 2000;
const LOOKUP_TEMPERATURE: f32 = 0.3;
const LOOKUP_MAX_TOKENS: u32 = 200;
const LOOKUP_MAX_WORDS: usize = 2;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDefinition {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub part_of_speech: String,
}

/// Request/response boundary between the story pipeline and the remote model.
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn title(&self, config: &StoryConfig) -> Result<String, ServiceError>;

    async fn chapter(
        &self,
        config: &StoryConfig,
        number: usize,
        planned_title: &str,
        story_title: &str,
        previous_context: &[String],
    ) -> Result<ChapterDraft, ServiceError>;

    async fn word_definition(
        &self,
        word: &str,
        context: Option<&str>,
    ) -> Result<WordDefinition, LookupError>;
}

#[derive(Debug)]
pub struct LlmContentService {
    llm: Box<dyn LlmClient>,
}

impl LlmContentService {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn generate(&self, prompt: String) -> Result<String, ServiceError> {
        let request = ChatRequest {
            system: STORY_SYSTEM_PROMPT.to_string(),
            user: prompt,
            temperature: STORY_TEMPERATURE,
            max_tokens: STORY_MAX_TOKENS,
            json_output: false,
        };

        match self.llm.chat(&request).await {
            Ok(text) => Ok(clean_response_text(&text)),
            Err(e) => {
                log::error!("Completion request failed: {:#}", e);
                Err(ServiceError::Generation(format!("{:#}", e)))
            }
        }
    }
}

pub fn title_prompt(config: &StoryConfig) -> String {
    format!(
        "Generate a captivating title for a {} story with the following details:\n\
         Plot: {}\n\
         Tone: {}\n\
         Audience: {}\n\
         \n\
         Return only the title, nothing else.",
        config.theme, config.plot, config.tone, config.audience
    )
}

/// Chapters titled as a finale or epilogue resolve the plot; every other one ends on a hook.
pub fn is_concluding_chapter(planned_title: &str) -> bool {
    let title = planned_title.to_lowercase();
    title.contains("final") || title.contains("epilogue")
}

pub fn chapter_prompt(
    config: &StoryConfig,
    number: usize,
    planned_title: &str,
    story_title: &str,
    previous_context: &[String],
) -> String {
    let context_text = if previous_context.is_empty() {
        String::new()
    } else {
        format!("\n\nPrevious chapters summary: {}", previous_context.join(" "))
    };

    let language_level = config.audience.language_level();
    let audience_instructions = if config.audience == Audience::Children {
        "- Use simple words and short sentences\n\
         - Include some dialogue to make it engaging for children\n\
         - Use descriptive language that paints a clear picture\n"
    } else {
        ""
    };

    let ending = if is_concluding_chapter(planned_title) {
        "- Provide a satisfying conclusion that resolves the main plot points\n\
         - Include a meaningful moral or lesson that fits the story naturally\n\
         - End with a sense of closure while leaving room for the reader's imagination"
    } else {
        "- End with a compelling hook for the next chapter"
    };

    format!(
        "Write Chapter {number} titled \"{planned_title}\" for the {theme} story \"{story_title}\".\n\
         \n\
         Story Details:\n\
         - Theme/Genre: {theme}\n\
         - Plot: {plot}\n\
         - Characters: {characters}\n\
         - Tone: {tone}\n\
         - Target Audience: {audience} ({language_level}){context_text}\n\
         \n\
         Requirements:\n\
         - Write 3-4 engaging paragraphs (400-600 words)\n\
         - Match the {tone} tone perfectly\n\
         - {language_level}\n\
         {audience_instructions}\
         - Include character development and plot progression\n\
         - Use vivid descriptions and dialogue\n\
         {ending}\n\
         \n\
         Return ONLY the chapter content, no extra formatting, labels, or internal reasoning.",
        theme = config.theme,
        plot = config.plot,
        characters = config.characters,
        tone = config.tone,
        audience = config.audience,
    )
}

/// Normalizes lookup input, rejecting anything that is not one or two words.
pub fn normalize_lookup_word(word: &str) -> Result<String, LookupError> {
    let cleaned = NON_WORD.replace_all(word, "").trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(LookupError::InvalidInput);
    }
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.len() > LOOKUP_MAX_WORDS {
        return Err(LookupError::TooManyWords);
    }
    Ok(words.join(" "))
}

fn definition_prompt(word: &str, context: Option<&str>) -> String {
    let context_text = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!(" as used in this context: \"{}\"", c),
        None => String::new(),
    };

    format!(
        "Provide a simple, child-friendly definition for the word or phrase \"{word}\"{context_text}.\n\
         \n\
         If the word is a proper noun, name, or not a valid English word, explain this in a helpful way.\n\
         \n\
         Format your response as a JSON object with these exact keys:\n\
         {{\n\
           \"word\": \"the word or phrase being defined\",\n\
           \"definition\": \"simple, clear, and child-friendly definition\",\n\
           \"example\": \"an example sentence using the word\",\n\
           \"partOfSpeech\": \"noun/verb/adjective/adverb/phrase/name\"\n\
         }}"
    )
}

fn parse_definition(word: &str, raw: &str) -> Result<WordDefinition, LookupError> {
    let json = strip_code_blocks(&clean_response_text(raw));
    let mut definition: WordDefinition = serde_json::from_str(&json).map_err(|e| {
        log::error!("Unparseable definition for '{}': {}. Body: {}", word, e, raw);
        LookupError::Service(e.to_string())
    })?;

    if definition.definition.trim().is_empty() {
        return Err(LookupError::NotFound(word.to_string()));
    }
    if definition.word.trim().is_empty() {
        definition.word = word.to_string();
    }
    Ok(definition)
}

#[async_trait]
impl ContentService for LlmContentService {
    async fn title(&self, config: &StoryConfig) -> Result<String, ServiceError> {
        log::info!("Requesting title for {} story", config.theme);
        self.generate(title_prompt(config)).await
    }

    async fn chapter(
        &self,
        config: &StoryConfig,
        number: usize,
        planned_title: &str,
        story_title: &str,
        previous_context: &[String],
    ) -> Result<ChapterDraft, ServiceError> {
        log::info!("Requesting chapter {} \"{}\"", number, planned_title);
        let prompt = chapter_prompt(config, number, planned_title, story_title, previous_context);
        let content = self.generate(prompt).await?;
        Ok(ChapterDraft {
            title: planned_title.to_string(),
            content,
        })
    }

    async fn word_definition(
        &self,
        word: &str,
        context: Option<&str>,
    ) -> Result<WordDefinition, LookupError> {
        let word = normalize_lookup_word(word)?;

        let request = ChatRequest {
            system: DICTIONARY_SYSTEM_PROMPT.to_string(),
            user: definition_prompt(&word, context),
            temperature: LOOKUP_TEMPERATURE,
            max_tokens: LOOKUP_MAX_TOKENS,
            json_output: true,
        };

        let raw = self.llm.chat(&request).await.map_err(|e| {
            log::error!("Definition request for '{}' failed: {:#}", word, e);
            LookupError::Service(format!("{:#}", e))
        })?;

        parse_definition(&word, &raw)
    }
}
