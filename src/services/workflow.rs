use crate::core::config::GenerationConfig;
use crate::core::story::{chapter_plan, Chapter, Story, StoryConfig, StoryEvent};
use crate::services::content::{ChapterDraft, ContentService};
use crate::services::error::{RunError, ServiceError};
use crate::utils::text::excerpt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub fn placeholder_content(number: usize) -> String {
    format!(
        "Chapter {} is being regenerated. Please try refreshing or creating a new story.",
        number
    )
}

/// Turns one chapter attempt into the chapter that goes into the story.
fn settle_chapter(number: usize, planned_title: &str, result: Result<ChapterDraft, ServiceError>) -> Chapter {
    let content = match result {
        Ok(draft) => draft.content,
        Err(e) => {
            log::warn!(
                "Chapter {} failed, substituting placeholder: {}",
                number,
                e.cause()
            );
            placeholder_content(number)
        }
    };

    Chapter {
        number,
        title: planned_title.to_string(),
        content,
    }
}

/// Drives a story run: title first, then every planned chapter in order.
pub struct StoryWorkflow {
    content: Box<dyn ContentService>,
    chapter_delay: Duration,
    context_chars: usize,
}

impl StoryWorkflow {
    pub fn new(content: Box<dyn ContentService>, config: &GenerationConfig) -> Self {
        Self {
            content,
            chapter_delay: config.chapter_delay(),
            context_chars: config.context_chars,
        }
    }

    pub fn content(&self) -> &dyn ContentService {
        self.content.as_ref()
    }

    /// Runs on a background task and streams events through the returned receiver.
    ///
    /// Dropping the receiver abandons the run; it still finishes but nobody listens.
    pub fn spawn(
        self: Arc<Self>,
        config: StoryConfig,
    ) -> (mpsc::UnboundedReceiver<StoryEvent>, JoinHandle<Result<Story, RunError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move { self.run(config, &tx).await });
        (rx, handle)
    }

    pub async fn run(
        &self,
        config: StoryConfig,
        events: &mpsc::UnboundedSender<StoryEvent>,
    ) -> Result<Story, RunError> {
        let emit = |event: StoryEvent| {
            if events.send(event).is_err() {
                log::debug!("Event receiver dropped, continuing without listener");
            }
        };

        let mut story = Story::default();
        emit(StoryEvent::Started);
        log::info!("Starting {} story run", config.theme);

        story.title = match self.content.title(&config).await {
            Ok(title) => title,
            Err(e) => {
                log::error!("Title generation failed: {}", e.cause());
                let err = RunError::TitleFailed(e.to_string());
                emit(StoryEvent::Failed(err.to_string()));
                return Err(err);
            }
        };
        emit(StoryEvent::Title(story.title.clone()));

        let plan = chapter_plan(config.theme.key());
        for (i, planned_title) in plan.iter().enumerate() {
            let number = i + 1;
            if i > 0 && !self.chapter_delay.is_zero() {
                tokio::time::sleep(self.chapter_delay).await;
            }

            let context: Vec<String> = story
                .chapters
                .iter()
                .map(|c| excerpt(&c.content, self.context_chars))
                .collect();

            let result = self
                .content
                .chapter(&config, number, planned_title, &story.title, &context)
                .await;
            let chapter = settle_chapter(number, planned_title, result);

            story.chapters.push(chapter.clone());
            emit(StoryEvent::Chapter(chapter));
        }

        log::info!("Story \"{}\" complete ({} chapters)", story.title, story.chapters.len());
        emit(StoryEvent::Completed);
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::RunState;
    use crate::core::story::{Audience, Theme, Tone, CHAPTER_COUNT};
    use crate::services::content::WordDefinition;
    use crate::services::error::LookupError;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct ChapterCall {
        number: usize,
        planned_title: String,
        story_title: String,
        context: Vec<String>,
    }

    #[derive(Default)]
    struct ScriptedContent {
        fail_title: bool,
        failing_chapters: HashSet<usize>,
        chapter_body: Option<String>,
        calls: Arc<Mutex<Vec<ChapterCall>>>,
    }

    #[async_trait]
    impl ContentService for ScriptedContent {
        async fn title(&self, _: &StoryConfig) -> Result<String, ServiceError> {
            if self.fail_title {
                return Err(ServiceError::Generation("API request failed: 401".to_string()));
            }
            Ok("Moonlit Vale".to_string())
        }

        async fn chapter(
            &self,
            _: &StoryConfig,
            number: usize,
            planned_title: &str,
            story_title: &str,
            previous_context: &[String],
        ) -> Result<ChapterDraft, ServiceError> {
            self.calls.lock().unwrap().push(ChapterCall {
                number,
                planned_title: planned_title.to_string(),
                story_title: story_title.to_string(),
                context: previous_context.to_vec(),
            });

            if self.failing_chapters.contains(&number) {
                return Err(ServiceError::Generation("timeout".to_string()));
            }
            let content = match &self.chapter_body {
                Some(body) => format!("{}{}", number, body),
                None => format!("Content of chapter {}", number),
            };
            Ok(ChapterDraft { title: planned_title.to_string(), content })
        }

        async fn word_definition(&self, _: &str, _: Option<&str>) -> Result<WordDefinition, LookupError> {
            Err(LookupError::InvalidInput)
        }
    }

    fn story_config(theme: Theme) -> StoryConfig {
        StoryConfig {
            theme,
            plot: "Two siblings search for a missing clockmaker.".to_string(),
            characters: "Ines and Pablo, twins.".to_string(),
            tone: Tone::Dreamy,
            audience: Audience::Family,
        }
    }

    fn no_delay() -> GenerationConfig {
        GenerationConfig {
            chapter_delay_ms: 0,
            context_chars: 200,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StoryEvent>) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_run_emits_title_then_five_chapters() -> Result<()> {
        let content = ScriptedContent::default();
        let calls = content.calls.clone();
        let workflow = StoryWorkflow::new(Box::new(content), &no_delay());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let story = workflow.run(story_config(Theme::Mystery), &tx).await?;
        let events = drain(&mut rx);

        assert_eq!(events.len(), 2 + CHAPTER_COUNT + 1);
        assert_eq!(events[0], StoryEvent::Started);
        assert_eq!(events[1], StoryEvent::Title("Moonlit Vale".to_string()));
        assert_eq!(events.last(), Some(&StoryEvent::Completed));

        let numbers: Vec<usize> = story.chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        let titles: Vec<&str> = story.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, chapter_plan("mystery").to_vec());

        for (event, chapter) in events[2..7].iter().zip(&story.chapters) {
            assert_eq!(event, &StoryEvent::Chapter(chapter.clone()));
        }

        let calls = calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.story_title == "Moonlit Vale"));
        assert_eq!(calls[4].planned_title, "Case Closed");
        Ok(())
    }

    #[tokio::test]
    async fn test_title_failure_is_fatal() {
        let content = ScriptedContent { fail_title: true, ..Default::default() };
        let calls = content.calls.clone();
        let workflow = StoryWorkflow::new(Box::new(content), &no_delay());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = workflow.run(story_config(Theme::Fantasy), &tx).await.unwrap_err();
        assert!(matches!(err, RunError::TitleFailed(_)));
        assert!(err.to_string().contains("Please try again"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], StoryEvent::Failed(_)));
        assert!(!events.iter().any(|e| matches!(e, StoryEvent::Chapter(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chapter_failure_becomes_placeholder_and_run_continues() -> Result<()> {
        let content = ScriptedContent {
            failing_chapters: [2, 5].into_iter().collect(),
            ..Default::default()
        };
        let calls = content.calls.clone();
        let workflow = StoryWorkflow::new(Box::new(content), &no_delay());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let story = workflow.run(story_config(Theme::Horror), &tx).await?;

        assert_eq!(story.chapters.len(), CHAPTER_COUNT);
        assert_eq!(
            story.chapters[1].content,
            "Chapter 2 is being regenerated. Please try refreshing or creating a new story."
        );
        assert_eq!(story.chapters[1].title, "The Terror Spreads");
        assert_eq!(story.chapters[4].content, placeholder_content(5));
        assert_eq!(story.chapters[2].content, "Content of chapter 3");
        assert_eq!(calls.lock().unwrap().len(), CHAPTER_COUNT);
        assert_eq!(drain(&mut rx).last(), Some(&StoryEvent::Completed));

        // Placeholders still feed the next chapter's context.
        assert_eq!(calls.lock().unwrap()[2].context[1], placeholder_content(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_context_only_contains_earlier_chapters_truncated() -> Result<()> {
        let content = ScriptedContent {
            chapter_body: Some("é".repeat(500)),
            ..Default::default()
        };
        let calls = content.calls.clone();
        let workflow = StoryWorkflow::new(Box::new(content), &no_delay());
        let (tx, _rx) = mpsc::unbounded_channel();

        workflow.run(story_config(Theme::Romance), &tx).await?;

        let calls = calls.lock().unwrap();
        for (i, call) in calls.iter().enumerate() {
            assert_eq!(call.number, i + 1);
            assert_eq!(call.context.len(), i);
            for (j, ctx) in call.context.iter().enumerate() {
                assert_eq!(ctx.chars().count(), 200);
                assert!(ctx.starts_with(&(j + 1).to_string()));
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_starts_fresh() -> Result<()> {
        let content = ScriptedContent {
            failing_chapters: [1, 2, 3, 4, 5].into_iter().collect(),
            ..Default::default()
        };
        let workflow = StoryWorkflow::new(Box::new(content), &no_delay());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = RunState::new();

        workflow.run(story_config(Theme::Adventure), &tx).await?;
        workflow.run(story_config(Theme::Adventure), &tx).await?;

        let events = drain(&mut rx);
        for event in &events {
            state.apply(event);
        }

        assert_eq!(state.story.chapters.len(), CHAPTER_COUNT);
        let numbers: Vec<usize> = state.story.chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(!state.generating);
        Ok(())
    }

    #[tokio::test]
    async fn test_spawn_streams_and_survives_dropped_receiver() -> Result<()> {
        let workflow = Arc::new(StoryWorkflow::new(Box::new(ScriptedContent::default()), &no_delay()));

        let (mut rx, handle) = Arc::clone(&workflow).spawn(story_config(Theme::SciFi));
        let mut state = RunState::new();
        while let Some(event) = rx.recv().await {
            state.apply(&event);
        }
        let story = handle.await??;
        assert_eq!(state.story, story);
        assert_eq!(state.story.chapters[0].title, "First Contact");

        let (rx, handle) = workflow.spawn(story_config(Theme::SciFi));
        drop(rx);
        assert_eq!(handle.await??.chapters.len(), CHAPTER_COUNT);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_chapters_are_paced() -> Result<()> {
        let config = GenerationConfig { chapter_delay_ms: 1000, context_chars: 200 };
        let workflow = StoryWorkflow::new(Box::new(ScriptedContent::default()), &config);
        let (tx, _rx) = mpsc::unbounded_channel();

        let started = tokio::time::Instant::now();
        workflow.run(story_config(Theme::Historical), &tx).await?;
        assert_eq!(started.elapsed(), Duration::from_secs((CHAPTER_COUNT - 1) as u64));
        Ok(())
    }
}
