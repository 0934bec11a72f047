use crate::core::story::{
    validate_characters, validate_plot, Audience, StoryConfig, Theme, Tone, PLOT_MAX_CHARS,
};
use anyhow::Result;
use inquire::error::CustomUserError;
use inquire::validator::Validation;
use inquire::{Select, Text};
use std::fmt;

/// Menu entry pairing a value with its label and description.
struct Choice<T> {
    value: T,
    label: &'static str,
    description: &'static str,
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label, self.description)
    }
}

macro_rules! choices {
    ($ty:ty) => {
        <$ty>::ALL
            .iter()
            .map(|v| Choice {
                value: *v,
                label: v.label(),
                description: v.description(),
            })
            .collect::<Vec<_>>()
    };
}

/// Walks the user through theme, plot, characters, tone and audience.
pub fn run_wizard() -> Result<StoryConfig> {
    let theme = Select::new("Choose your story's theme:", choices!(Theme))
        .prompt()?
        .value;

    let plot = Text::new("Describe your plot:")
        .with_help_message(&format!(
            "What happens in your story? Up to {} characters.",
            PLOT_MAX_CHARS
        ))
        .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
            Ok(match validate_plot(input) {
                Ok(()) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()?;

    let characters = Text::new("Who are the main characters?")
        .with_help_message("Names, traits, relationships")
        .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
            Ok(match validate_characters(input) {
                Ok(()) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()?;

    let tone = Select::new("Set the tone:", choices!(Tone)).prompt()?.value;
    let audience = Select::new("Who is the story for?", choices!(Audience))
        .prompt()?
        .value;

    let config = StoryConfig {
        theme,
        plot: plot.trim().to_string(),
        characters: characters.trim().to_string(),
        tone,
        audience,
    };
    config.validate()?;

    log::debug!("Wizard produced {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choices_cover_every_option() {
        let themes = choices!(Theme);
        assert_eq!(themes.len(), Theme::ALL.len());
        assert_eq!(
            themes[1].to_string(),
            "Science Fiction - Future technology, space exploration, and scientific wonders"
        );
        assert_eq!(themes[1].value, Theme::SciFi);

        let audiences = choices!(Audience);
        assert_eq!(audiences.last().map(|c| c.value), Some(Audience::Family));
    }
}
