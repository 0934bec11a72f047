use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use story_weaver::core::config::{Config, DEFAULT_CONFIG_PATH};
use story_weaver::core::state::RunState;
use story_weaver::services::content::LlmContentService;
use story_weaver::services::llm;
use story_weaver::services::setup;
use story_weaver::services::workflow::StoryWorkflow;
use story_weaver::ui::{self, AfterFailure, ReaderExit};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match Config::load_from(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let llm = llm::create_llm(&config)?;
    let content = LlmContentService::new(llm);
    let workflow = Arc::new(StoryWorkflow::new(Box::new(content), &config.story));
    let mut state = RunState::new();

    'stories: loop {
        let story_config = setup::run_wizard()?;

        loop {
            ui::generate(&workflow, story_config.clone(), &mut state).await?;

            if state.has_failed() {
                match ui::ask_retry()? {
                    AfterFailure::Retry => continue,
                    AfterFailure::NewStory => continue 'stories,
                }
            }

            match ui::read_story(&mut state, workflow.content(), &config.output_folder).await? {
                ReaderExit::NewStory => continue 'stories,
                ReaderExit::Quit => break 'stories,
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
