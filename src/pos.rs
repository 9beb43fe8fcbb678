//! Part-of-speech labels in the meaning language

/// English abbreviation to Chinese label
const POS_LABELS: &[(&str, &str)] = &[
    ("n.", "名词"),
    ("v.", "动词"),
    ("adj.", "形容词"),
    ("adv.", "副词"),
    ("prep.", "介词"),
    ("conj.", "连词"),
    ("pron.", "代词"),
    ("intj.", "感叹词"),
    ("num.", "数字"),
    ("art.", "冠词"),
];

/// Joins several localized labels
const ALTERNATIVE: &str = "或";

fn label(abbrev: &str) -> &str {
    POS_LABELS
        .iter()
        .find(|(en, _)| *en == abbrev)
        .map_or(abbrev, |(_, zh)| *zh)
}

/// Localize a part of speech such as `"n./v."`
///
/// Each `/`-separated value is mapped on its own and the results are joined
/// with "或". Unknown abbreviations pass through unchanged.
#[must_use]
pub fn localize(part_of_speech: &str) -> String {
    if part_of_speech.contains('/') {
        part_of_speech
            .split('/')
            .map(|p| label(p.trim()))
            .collect::<Vec<_>>()
            .join(ALTERNATIVE)
    } else {
        label(part_of_speech).to_string()
    }
}
