//! Default names derived from type tags.
//!
//! Step slugs, labels, wizard names and titles fall back to values computed
//! from a type tag such as `UserProfileStep` when no explicit value is given.

/// Split a type tag into lowercase words on case boundaries, `_`, `-` and
/// whitespace.
fn words(tag: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = tag.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "HTTPServer" splits as "http" + "server"
            if prev.is_lowercase() || prev.is_ascii_digit() || next_is_lower {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `UserProfileStep` -> `user-profile-step`
pub fn kebab_case(tag: &str) -> String {
    words(tag).join("-")
}

/// `RegisterWizard` -> `register_wizard`
pub fn snake_case(tag: &str) -> String {
    words(tag).join("_")
}

/// Uppercase the first character, leaving the rest untouched.
pub fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `user-profile-step` -> `User profile step`
pub fn label_from_slug(slug: &str) -> String {
    ucfirst(&slug.replace(['-', '_'], " "))
}

/// `register_wizard` -> `Register wizard`
pub fn title_from_name(name: &str) -> String {
    ucfirst(&name.replace('_', " "))
}
