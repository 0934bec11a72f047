use crate::core::story::{Chapter, Story, StoryEvent, CHAPTER_COUNT};

/// Reader-side view of a run: what has arrived so far and where the reader is.
#[derive(Debug, Default, Clone)]
pub struct RunState {
    pub story: Story,
    pub current: usize,
    pub generating: bool,
    pub last_error: Option<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from the previous run.
    pub fn begin_run(&mut self) {
        self.story = Story::default();
        self.current = 0;
        self.generating = true;
        self.last_error = None;
    }

    pub fn apply(&mut self, event: &StoryEvent) {
        match event {
            StoryEvent::Started => self.begin_run(),
            StoryEvent::Title(title) => self.story.title = title.clone(),
            StoryEvent::Chapter(chapter) => self.story.chapters.push(chapter.clone()),
            StoryEvent::Completed => self.generating = false,
            StoryEvent::Failed(message) => {
                self.generating = false;
                self.last_error = Some(message.clone());
            }
        }
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.story.chapters.get(self.current)
    }

    pub fn next_chapter(&mut self) -> Option<&Chapter> {
        if self.current + 1 < self.story.chapters.len() {
            self.current += 1;
        }
        self.current_chapter()
    }

    pub fn previous_chapter(&mut self) -> Option<&Chapter> {
        self.current = self.current.saturating_sub(1);
        self.current_chapter()
    }

    pub fn select_chapter(&mut self, index: usize) -> Option<&Chapter> {
        if index < self.story.chapters.len() {
            self.current = index;
        }
        self.current_chapter()
    }

    pub fn has_failed(&self) -> bool {
        self.last_error.is_some()
    }

    /// `(generated, planned)` chapter counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.story.chapters.len(), CHAPTER_COUNT)
    }
}
