//! Best-effort classification of free-text location strings into US states.
//!
//! Business locations arrive as unstructured text ("Houston, TX", "Dallas TX
//! 75201", sometimes just "Miami"), so classification is a heuristic: the
//! string is tokenized and scanned from the end for a state abbreviation,
//! falling back to a whole-name match. Anything unrecognized classifies as
//! [`OTHER`]. Callers must treat the result as approximate; it is only used
//! for aggregate dashboards, never for filtering individual records.

pub const OTHER: &str = "Other";

const US_STATES: [(&str, &str); 50] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

fn state_name(abbreviation: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(abbreviation))
        .map(|(_, name)| *name)
}

/// Classify a free-text location into a full state name, if possible.
///
/// Tokens are scanned right to left (US addresses usually end "City, ST" or
/// "City ST ZIP"), preferring two-letter abbreviations and falling back to a
/// full state name appearing anywhere in the string.
pub fn classify(location: &str) -> Option<&'static str> {
    let tokens: Vec<&str> = location
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| !t.is_empty())
        .collect();

    for token in tokens.iter().rev() {
        if token.len() == 2 {
            if let Some(name) = state_name(token) {
                return Some(name);
            }
        }
    }

    let lowered = location.to_lowercase();
    US_STATES
        .iter()
        .find(|(_, name)| lowered.contains(&name.to_lowercase()))
        .map(|(_, name)| *name)
}

/// Like [`classify`], with the documented `"Other"` fallback for anything
/// that does not match.
pub fn classify_or_other(location: &str) -> &'static str {
    classify(location).unwrap_or(OTHER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_abbreviation_wins() {
        assert_eq!(classify("Houston, TX"), Some("Texas"));
        assert_eq!(classify("Dallas TX 75201"), Some("Texas"));
        assert_eq!(classify("Brooklyn NY"), Some("New York"));
    }

    #[test]
    fn abbreviation_is_case_insensitive() {
        assert_eq!(classify("portland, or"), Some("Oregon"));
    }

    #[test]
    fn full_state_name_matches_without_abbreviation() {
        assert_eq!(classify("Somewhere in North Carolina"), Some("North Carolina"));
    }

    #[test]
    fn unrecognized_text_falls_back_to_other() {
        assert_eq!(classify_or_other("Toronto, Canada"), OTHER);
        assert_eq!(classify_or_other(""), OTHER);
        assert_eq!(classify_or_other("123 Main Street"), OTHER);
    }

    #[test]
    fn city_names_do_not_shadow_the_state_suffix() {
        // "Washington" appears as a city here; the trailing "DC" is not a
        // state, so the whole-name fallback picks up Washington. This is the
        // documented failure mode of the heuristic.
        assert_eq!(classify("Washington, DC"), Some("Washington"));
    }
}
