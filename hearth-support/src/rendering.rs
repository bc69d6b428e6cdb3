//! Text rendering helpers for log lines and error messages.
//!
//! Provider names come from [`std::any::type_name`] and service names are
//! free-form strings, so both need a little massaging before a human reads
//! them.

/// Renders an ordered sequence of names, e.g. the providers of a phase.
///
/// # Examples
/// ```
/// use hearth_support::rendering::render_sequence;
///
/// assert_eq!(render_sequence(&["Auth", "Vfs", "Session"]), "Auth → Vfs → Session");
/// let nothing: [&str; 0] = [];
/// assert_eq!(render_sequence(&nothing), "(none)");
/// ```
pub fn render_sequence(names: &[impl AsRef<str>]) -> String {
    if names.is_empty() {
        return "(none)".to_string();
    }

    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Strips module paths from a type name, keeping generic structure.
///
/// ```
/// use hearth_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::providers::AuthProvider"), "AuthProvider");
/// assert_eq!(
///     shorten_type_name("my_app::Wrapper<alloc::sync::Arc<my_app::Vfs>>"),
///     "Wrapper<Arc<Vfs>>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment_start = 0;

    for (idx, ch) in full_name.char_indices() {
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&') {
            out.push_str(last_path_segment(&full_name[segment_start..idx]));
            out.push(ch);
            segment_start = idx + ch.len_utf8();
        }
    }
    out.push_str(last_path_segment(&full_name[segment_start..]));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Picks registered names that look like what the caller meant.
///
/// Names within a small edit distance rank first, then substring matches,
/// then names sharing a prefix of at least three characters. Comparison is
/// case-insensitive.
///
/// ```
/// use hearth_support::rendering::suggest_similar;
///
/// let names = ["osjs/vfs", "osjs/auth", "osjs/settings"];
/// assert_eq!(suggest_similar("osjs/vsf", &names, 1), vec!["osjs/vfs"]);
/// ```
pub fn suggest_similar(requested: &str, available: &[impl AsRef<str>], limit: usize) -> Vec<String> {
    let wanted = requested.to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.eq_ignore_ascii_case(requested))
        .filter_map(|name| score(&wanted, &name.to_lowercase()).map(|s| (s, name)))
        .collect();

    // Stable sort keeps registration order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut out: Vec<String> = Vec::new();
    for (_, name) in scored {
        if out.len() == limit {
            break;
        }
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn score(wanted: &str, candidate: &str) -> Option<usize> {
    let distance = edit_distance(wanted, candidate);
    let tolerance = (wanted.chars().count().max(candidate.chars().count()) / 3).max(1);
    if distance <= tolerance {
        return Some(200 - distance.min(100));
    }

    if candidate.contains(wanted) || wanted.contains(candidate) {
        return Some(100);
    }

    let common = wanted
        .chars()
        .zip(candidate.chars())
        .take_while(|(a, b)| a == b)
        .count();
    (common >= 3).then_some(common)
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_single_name() {
        assert_eq!(render_sequence(&["Auth"]), "Auth");
    }

    #[test]
    fn render_owned_names() {
        let names = vec!["A".to_string(), "B".to_string()];
        assert_eq!(render_sequence(&names), "A → B");
    }

    #[test]
    fn shorten_plain_name() {
        assert_eq!(shorten_type_name("Settings"), "Settings");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("core::option::Option<alloc::vec::Vec<my::Thing>>"),
            "Option<Vec<Thing>>"
        );
    }

    #[test]
    fn shorten_tuple_and_reference() {
        assert_eq!(shorten_type_name("(a::B, &c::D)"), "(B, &D)");
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("vfs", "vsf"), 2);
    }

    #[test]
    fn suggestions_prefer_close_names() {
        let names = ["session", "settings", "socket"];
        let suggestions = suggest_similar("setings", &names, 2);
        assert_eq!(suggestions.first().map(String::as_str), Some("settings"));
    }

    #[test]
    fn suggestions_use_substrings() {
        let names = ["osjs/packages", "osjs/vfs"];
        assert_eq!(suggest_similar("packages", &names, 3), vec!["osjs/packages"]);
    }

    #[test]
    fn suggestions_respect_limit() {
        let names = ["svc-a", "svc-b", "svc-c"];
        assert_eq!(suggest_similar("svc", &names, 2).len(), 2);
    }

    #[test]
    fn no_suggestions_for_unrelated() {
        let names = ["database"];
        assert!(suggest_similar("xyz", &names, 3).is_empty());
    }

    #[test]
    fn exact_match_is_not_suggested() {
        let names = ["vfs"];
        assert!(suggest_similar("vfs", &names, 3).is_empty());
    }
}
