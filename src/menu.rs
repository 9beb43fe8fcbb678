//! Interactive session picker (`vocab` with no subcommand)

use dialoguer::{Confirm, Select};

use crate::book::Profile;
use crate::{Error, Result};

/// What the learner asked for
#[derive(Debug, Clone)]
pub struct SessionChoice {
    pub profile: Profile,
    /// Run a dictation instead of a quiz
    pub dictation: bool,
    /// Show and speak every item before asking for it
    pub reveal: bool,
}

/// Whether the reveal question has to be asked for `profile`
#[must_use]
pub const fn needs_reveal_prompt(profile: &Profile, dictation: bool) -> bool {
    !dictation && profile.learning_mode.is_none()
}

/// Reveal setting for a quiz: an explicit request wins over the profile's `learning_mode`
#[must_use]
pub fn reveal_mode(requested: Option<bool>, profile: &Profile) -> bool {
    requested.or(profile.learning_mode).unwrap_or(false)
}

/// Ask which profile to drill and how
///
/// # Errors
///
/// Returns error if there are no profiles or user input fails
pub fn choose_session(profiles: &[Profile]) -> Result<SessionChoice> {
    if profiles.is_empty() {
        return Err(Error::Book("no profiles to choose from".to_string()));
    }

    let labels: Vec<&str> = profiles.iter().map(Profile::display_name).collect();
    let index = Select::new()
        .with_prompt("Select a word book")
        .items(&labels)
        .default(0)
        .interact()?;
    let profile = profiles[index].clone();

    let dictation = Confirm::new()
        .with_prompt("Dictation?")
        .default(false)
        .interact()?;

    let reveal = if needs_reveal_prompt(&profile, dictation) {
        Confirm::new()
            .with_prompt("Learning mode (show each item first)?")
            .default(false)
            .interact()?
    } else {
        reveal_mode(None, &profile)
    };

    tracing::debug!(
        profile = profile.display_name(),
        dictation,
        reveal,
        "session chosen"
    );

    Ok(SessionChoice {
        profile,
        dictation,
        reveal,
    })
}
