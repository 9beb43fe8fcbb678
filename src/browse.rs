//! Read-only listing of a unit

use crate::Result;
use crate::item::{Item, Unit};
use crate::terminal::Console;

/// One listing line: `key ----- <pos><meaning>  <phonetic>`
#[must_use]
pub fn browse_line(item: &Item) -> String {
    format!(
        "{} ----- {}  {}",
        item.key_text,
        item.gloss(),
        item.phonetic_symbol()
    )
    .trim_end()
    .to_string()
}

/// Listing lines for every item, words first
#[must_use]
pub fn browse_lines(unit: &Unit) -> Vec<String> {
    unit.items().map(browse_line).collect()
}

/// Print the unit and wait for the learner to acknowledge
///
/// # Errors
///
/// Returns error if input cannot be read
pub fn browse(unit: &Unit, console: &mut dyn Console) -> Result<()> {
    console.clear();
    for line in browse_lines(unit) {
        console.print_line(&line);
    }
    console.pause("Press Enter to exit")?;
    console.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_with_all_fields() {
        let item = Item::new("cat", "猫")
            .with_part_of_speech("n.")
            .with_phonetic_symbol("/kæt/");
        assert_eq!(browse_line(&item), "cat ----- n.猫  /kæt/");
    }

    #[test]
    fn line_with_missing_optionals() {
        assert_eq!(browse_line(&Item::new("look after", "照顾")), "look after ----- 照顾");
    }

    #[test]
    fn lines_follow_section_order() {
        let unit = Unit::new(
            vec![Item::new("cat", "猫"), Item::new("dog", "狗")],
            vec![Item::new("look after", "照顾")],
        );
        let lines = browse_lines(&unit);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("cat"));
        assert!(lines[2].starts_with("look after"));
    }
}
