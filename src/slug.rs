//! URL-friendly business slugs of the form `<name>-<id>`.
//!
//! The numeric id is always the token after the final hyphen, so a slug
//! survives arbitrary punctuation in the display name.

/// Build a slug from a business display name and id.
///
/// The name is lower-cased, punctuation is stripped, and whitespace collapses
/// to single hyphens. An empty or all-punctuation name falls back to
/// `business-<id>`.
pub fn business_slug(name: &str, id: i64) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                // Whitespace and hyphens both become separators; everything
                // else is dropped entirely.
                match c {
                    ' ' | '\t' | '\n' | '-' | '_' => ' ',
                    _ => '\u{0}',
                }
            }
        })
        .filter(|c| *c != '\u{0}')
        .collect();

    let body: Vec<&str> = cleaned.split_whitespace().collect();
    if body.is_empty() {
        return format!("business-{id}");
    }

    format!("{}-{id}", body.join("-"))
}

/// Extract the business id from a raw id or a slug.
///
/// A bare number is accepted as-is; otherwise the token after the last hyphen
/// must parse as a positive integer.
pub fn extract_business_id(id_or_slug: &str) -> Option<i64> {
    if let Ok(id) = id_or_slug.parse::<i64>() {
        return (id > 0).then_some(id);
    }

    let tail = id_or_slug.rsplit('-').next()?;
    let id = tail.parse::<i64>().ok()?;
    (id > 0).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_punctuation_and_collapses_spaces() {
        assert_eq!(
            business_slug("Joe's  Diner & Grill", 42),
            "joes-diner-grill-42"
        );
        assert_eq!(business_slug("ACME, Inc.", 7), "acme-inc-7");
    }

    #[test]
    fn slug_handles_empty_and_symbol_only_names() {
        assert_eq!(business_slug("", 9), "business-9");
        assert_eq!(business_slug("!!!", 9), "business-9");
    }

    #[test]
    fn slug_does_not_double_hyphenate() {
        assert_eq!(business_slug("A - B -- C", 1), "a-b-c-1");
    }

    #[test]
    fn extract_accepts_raw_ids() {
        assert_eq!(extract_business_id("401522"), Some(401522));
    }

    #[test]
    fn extract_takes_the_trailing_token() {
        assert_eq!(extract_business_id("forte-enterprises-401522"), Some(401522));
        assert_eq!(
            extract_business_id(&business_slug("1 Forte Enterprises", 401522)),
            Some(401522)
        );
    }

    #[test]
    fn extract_rejects_garbage() {
        assert_eq!(extract_business_id("forte-enterprises"), None);
        assert_eq!(extract_business_id(""), None);
        assert_eq!(extract_business_id("-0"), None);
        assert_eq!(extract_business_id("abc--5"), Some(5));
    }
}
