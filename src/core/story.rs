use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CHAPTER_COUNT: usize = 5;
pub const PLOT_MIN_CHARS: usize = 10;
pub const PLOT_MAX_CHARS: usize = 500;
pub const CHARACTERS_MIN_CHARS: usize = 5;

const FALLBACK_PLAN: &str = "adventure";
const ADVENTURE_PLAN: [&str; CHAPTER_COUNT] =
    ["The Journey Begins", "Into the Unknown", "Trials and Tribulations", "The Final Push", "Victory"];

const CHAPTER_PLANS: &[(&str, [&str; CHAPTER_COUNT])] = &[
    ("fantasy", ["The Awakening", "Shadows Stir", "The Quest Begins", "Trials of Magic", "Destiny Fulfilled"]),
    ("sci-fi", ["First Contact", "Beyond the Stars", "The Discovery", "Quantum Leap", "New Horizons"]),
    ("romance", ["Unexpected Encounter", "Hearts Collide", "Growing Closer", "The Challenge", "Love Conquers All"]),
    ("mystery", ["The First Clue", "Deeper Secrets", "Pieces Align", "The Truth Emerges", "Case Closed"]),
    ("horror", ["Something Stirring", "The Terror Spreads", "No Escape", "Face the Darkness", "Final Confrontation"]),
    ("historical", ["Echoes of the Past", "Winds of Change", "The Turning Point", "Against All Odds", "Legacy"]),
    (FALLBACK_PLAN, ADVENTURE_PLAN),
];

/// Returns the fixed chapter titles for a theme key.
///
/// Unknown keys get the adventure plan.
pub fn chapter_plan(theme: &str) -> &'static [&'static str; CHAPTER_COUNT] {
    let lookup = |key: &str| {
        CHAPTER_PLANS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, plan)| plan)
    };

    lookup(theme).unwrap_or_else(|| {
        log::debug!("No chapter plan for theme '{}', using {}", theme, FALLBACK_PLAN);
        lookup(FALLBACK_PLAN).unwrap_or(&ADVENTURE_PLAN)
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

macro_rules! story_option {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $key:literal $(| $alias:literal)*, $label:literal, $desc:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim().to_lowercase();
                match s.as_str() {
                    $($key $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(ParseOptionError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

story_option! {
    /// Story genre chosen in the first wizard step.
    Theme, "theme" {
        Fantasy => "fantasy", "Fantasy", "Magic, mythical creatures, and otherworldly adventures";
        SciFi => "sci-fi" | "scifi", "Science Fiction", "Future technology, space exploration, and scientific wonders";
        Romance => "romance", "Romance", "Love stories, relationships, and emotional journeys";
        Mystery => "mystery", "Mystery", "Puzzles, secrets, and thrilling investigations";
        Horror => "horror", "Horror", "Suspense, supernatural events, and chilling tales";
        Historical => "historical", "Historical", "Past eras, real events, and period settings";
        Adventure => "adventure", "Adventure", "Exciting journeys, exploration, and daring quests";
    }
}

story_option! {
    Tone, "tone" {
        Lighthearted => "lighthearted", "Lighthearted", "Fun, cheerful, and optimistic";
        Dark => "dark", "Dark", "Serious, intense, and brooding";
        Humorous => "humorous", "Humorous", "Funny, witty, and entertaining";
        Emotional => "emotional", "Emotional", "Deep, touching, and heartfelt";
        Suspenseful => "suspenseful", "Suspenseful", "Tense, thrilling, and edge-of-your-seat";
        Dreamy => "dreamy", "Dreamy", "Ethereal, poetic, and imaginative";
    }
}

story_option! {
    Audience, "audience" {
        Children => "children", "Children (6-12)", "Simple language, fun adventures";
        Teens => "teens" | "young-adult", "Teenagers (13-17)", "Coming-of-age themes, relatable characters";
        Adults => "adults" | "adult", "Adults (18+)", "Complex themes, mature content";
        Family => "family", "Family-Friendly", "Suitable for all ages";
    }
}

impl Theme {
    pub fn chapter_plan(&self) -> &'static [&'static str; CHAPTER_COUNT] {
        chapter_plan(self.key())
    }
}

impl Audience {
    /// Reading-level directive given to the model for this audience.
    pub fn language_level(&self) -> &'static str {
        match self {
            Audience::Children => {
                "Use simple words and short sentences. Aim for a 6-8 year old reading level."
            }
            Audience::Teens => {
                "Use clear language with some more complex vocabulary. Aim for a 12+ year old reading level."
            }
            Audience::Adults | Audience::Family => {
                "Use natural language appropriate for adult readers."
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoryConfigError {
    #[error("Plot must be longer than {} characters", PLOT_MIN_CHARS)]
    PlotTooShort,
    #[error("Plot must be at most {} characters", PLOT_MAX_CHARS)]
    PlotTooLong,
    #[error("Characters must be longer than {} characters", CHARACTERS_MIN_CHARS)]
    CharactersTooShort,
}

/// Everything the wizard collects before a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryConfig {
    pub theme: Theme,
    pub plot: String,
    pub characters: String,
    pub tone: Tone,
    pub audience: Audience,
}

impl StoryConfig {
    pub fn validate(&self) -> Result<(), StoryConfigError> {
        validate_plot(&self.plot)?;
        validate_characters(&self.characters)
    }
}

pub fn validate_plot(plot: &str) -> Result<(), StoryConfigError> {
    let len = plot.trim().chars().count();
    if len <= PLOT_MIN_CHARS {
        return Err(StoryConfigError::PlotTooShort);
    }
    if len > PLOT_MAX_CHARS {
        return Err(StoryConfigError::PlotTooLong);
    }
    Ok(())
}

pub fn validate_characters(characters: &str) -> Result<(), StoryConfigError> {
    if characters.trim().chars().count() <= CHARACTERS_MIN_CHARS {
        return Err(StoryConfigError::CharactersTooShort);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based position in the story.
    pub number: usize,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Story {
    pub fn export_as_text(&self) -> String {
        export_as_text(&self.title, &self.chapters)
    }
}

/// Progress notifications pushed to the caller during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    Started,
    Title(String),
    Chapter(Chapter),
    Completed,
    Failed(String),
}

pub fn export_as_text(story_title: &str, chapters: &[Chapter]) -> String {
    let mut out = format!("{}\n\n", story_title);
    for chapter in chapters {
        out.push_str(&format!(
            "Chapter {}: {}\n\n{}\n\n",
            chapter.number, chapter.title, chapter.content
        ));
    }
    out
}

pub fn export_file_name(story_title: &str) -> String {
    let stem = story_title.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = if stem.is_empty() { "story".to_string() } else { stem };
    format!("{}.txt", stem)
}
