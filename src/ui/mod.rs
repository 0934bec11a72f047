use crate::core::state::RunState;
use crate::core::story::{export_file_name, StoryConfig, StoryEvent};
use crate::services::content::{ContentService, WordDefinition};
use crate::services::error::LookupError;
use crate::services::workflow::StoryWorkflow;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Select, Text};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the reader asked for when leaving the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    NewStory,
    Quit,
}

/// What to do after a run failed before producing a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFailure {
    Retry,
    NewStory,
}

impl From<bool> for AfterFailure {
    fn from(retry: bool) -> Self {
        if retry {
            AfterFailure::Retry
        } else {
            AfterFailure::NewStory
        }
    }
}

const NEXT: &str = "Next chapter";
const PREVIOUS: &str = "Previous chapter";
const JUMP: &str = "Jump to chapter";
const EXPORT: &str = "Export as text";
const LOOKUP: &str = "Look up a word";
const NEW_STORY: &str = "Create a new story";
const QUIT: &str = "Quit";

/// Runs one story and renders chapters as they arrive.
pub async fn generate(
    workflow: &Arc<StoryWorkflow>,
    config: StoryConfig,
    state: &mut RunState,
) -> Result<()> {
    let (_, planned) = state.progress();
    let pb = ProgressBar::new(planned as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"));
    pb.set_message("Weaving your story...");

    let (mut rx, handle) = Arc::clone(workflow).spawn(config);
    while let Some(event) = rx.recv().await {
        state.apply(&event);
        match &event {
            StoryEvent::Title(title) => pb.println(format!("\n*** {} ***\n", title)),
            StoryEvent::Chapter(chapter) => {
                pb.set_message(format!("Chapter {}: {}", chapter.number, chapter.title));
                pb.inc(1);
            }
            StoryEvent::Failed(message) => pb.println(message.clone()),
            StoryEvent::Started | StoryEvent::Completed => {}
        }
    }
    pb.finish_and_clear();

    if let Err(e) = handle.await.context("Story task panicked")? {
        log::error!("Run failed: {}", e);
    }
    Ok(())
}

fn print_current(state: &RunState) {
    if let Some(chapter) = state.current_chapter() {
        let (generated, _) = state.progress();
        println!(
            "\n{} ({} of {})\n\nChapter {}: {}\n\n{}\n",
            state.story.title, chapter.number, generated, chapter.number, chapter.title, chapter.content
        );
    }
}

/// Paginated reading loop over a finished run.
pub async fn read_story(
    state: &mut RunState,
    content: &dyn ContentService,
    output_folder: &str,
) -> Result<ReaderExit> {
    print_current(state);

    loop {
        let action = Select::new(
            "What next?",
            vec![NEXT, PREVIOUS, JUMP, EXPORT, LOOKUP, NEW_STORY, QUIT],
        )
        .prompt()?;

        match action {
            NEXT => {
                state.next_chapter();
                print_current(state);
            }
            PREVIOUS => {
                state.previous_chapter();
                print_current(state);
            }
            JUMP => {
                let options: Vec<String> = state
                    .story
                    .chapters
                    .iter()
                    .map(|c| format!("Chapter {}: {}", c.number, c.title))
                    .collect();
                if options.is_empty() {
                    continue;
                }
                let index = Select::new("Chapter:", options).raw_prompt()?.index;
                state.select_chapter(index);
                print_current(state);
            }
            EXPORT => {
                let path = export_story(state, Path::new(output_folder)).await?;
                println!("Saved to {}", path.display());
            }
            LOOKUP => word_helper(content).await?,
            NEW_STORY => return Ok(ReaderExit::NewStory),
            _ => return Ok(ReaderExit::Quit),
        }
    }
}

pub async fn export_story(state: &RunState, folder: &Path) -> Result<PathBuf> {
    let path = folder.join(export_file_name(&state.story.title));
    tokio::fs::write(&path, state.story.export_as_text())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn ask_retry() -> Result<AfterFailure> {
    let retry = Confirm::new("Story generation failed. Try again?")
        .with_default(true)
        .with_help_message("Answering no goes back to story setup")
        .prompt()?;
    Ok(AfterFailure::from(retry))
}

async fn word_helper(content: &dyn ContentService) -> Result<()> {
    println!("I can help explain any words you find difficult. Leave empty to go back.");
    loop {
        let input = Text::new("Word:").prompt()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        match content.word_definition(input, None).await {
            Ok(definition) => println!("{}", format_definition(input, &definition)),
            Err(e) => println!("{}", lookup_message(&e, input)),
        }
    }
}

pub fn format_definition(input: &str, definition: &WordDefinition) -> String {
    let mut out = format!("Here's what \"{}\" means:\n", input);
    if definition.part_of_speech.is_empty() {
        out.push_str(&format!("  {}\n", definition.word));
    } else {
        out.push_str(&format!("  {} ({})\n", definition.word, definition.part_of_speech));
    }
    out.push_str(&format!("  {}\n", definition.definition));
    if !definition.example.is_empty() {
        out.push_str(&format!("  Example: \"{}\"\n", definition.example));
    }
    out
}

pub fn lookup_message(error: &LookupError, input: &str) -> String {
    match error {
        LookupError::TooManyWords => {
            "Please enter just one word or a short phrase (up to 2 words).".to_string()
        }
        LookupError::InvalidInput => {
            "Please enter a word to look up. It should contain letters.".to_string()
        }
        LookupError::NotFound(_) => format!(
            "I couldn't find \"{}\" in the dictionary. It might be a name, place, or a less common word. \
             Could you try a different word or check the spelling?",
            input
        ),
        LookupError::Service(_) => {
            "I'm having trouble finding that word. Could you try a different one?".to_string()
        }
    }
}
