//! Horse and jockey name normalization.

use regex::Regex;
use std::sync::OnceLock;

fn particle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([DdOoLl])'([A-Za-z])").unwrap())
}

fn initials_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]\.\s*(?:[A-Za-z]\.?)?$").unwrap())
}

fn trailing_initial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]\.?$").unwrap())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Storage key for a horse: uppercase, trimmed, single-spaced.
pub fn horse_key(name: &str) -> String {
    collapse_whitespace(name).to_uppercase()
}

/// Title-case a name; a letter is capitalized when it does not follow another letter.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Display form of a horse name, e.g. `"D'ARTAGNAN DEL SUR"` -> `"D'Artagnan Del Sur"`.
pub fn horse_display(name: &str) -> String {
    let s = collapse_whitespace(name);
    if s.is_empty() {
        return s;
    }
    let titled = title_case(&s);
    particle_re()
        .replace_all(&titled, |caps: &regex::Captures| {
            format!("{}'{}", caps[1].to_uppercase(), caps[2].to_uppercase())
        })
        .into_owned()
}

fn initial(given: &str) -> String {
    given
        .chars()
        .next()
        .map(|c| format!("{}.", c.to_uppercase()))
        .unwrap_or_default()
}

/// Short jockey name, `"Vizcarra Jose A."` -> `"J. Vizcarra"`, `"Vai, Angel"` -> `"A. Vai"`.
///
/// Without a comma the first token is the surname and the second the given name, unless
/// there are three or more tokens ending in a lone initial, in which case the given name is
/// the token before that initial. `"Jose A. Vizcarra"` (initial in second place) is read
/// given-name first.
pub fn jockey_short(full: &str) -> String {
    let s = collapse_whitespace(full);
    if s.is_empty() {
        return s;
    }

    if let Some((surname, rest)) = s.split_once(',') {
        let surname = surname.trim();
        return match rest.split_whitespace().next() {
            Some(given) => format!("{} {}", initial(given), surname).trim().to_string(),
            None => surname.to_string(),
        };
    }

    let parts: Vec<&str> = s.split(' ').collect();
    if parts.len() == 1 {
        return s;
    }

    let last = parts[parts.len() - 1];
    if parts.len() >= 3 && parts[1].ends_with('.') && !trailing_initial_re().is_match(last) {
        return format!("{} {}", initial(parts[0]), last);
    }

    let surname = parts[0];
    let given = if parts.len() >= 3 && trailing_initial_re().is_match(last) {
        parts[parts.len() - 2]
    } else {
        parts[1]
    };
    format!("{} {}", initial(given), surname).trim().to_string()
}

/// Whether a jockey value is only initials such as `"V. A."` or `"J."`.
pub fn is_bare_initials(value: &str) -> bool {
    initials_re().is_match(value.trim())
}

/// Short jockey name for a performance, rebuilt from the roster when the results sheet only
/// carries initials.
pub fn jockey_for_display(recorded: &str, roster: &str) -> String {
    let recorded = recorded.trim();
    let roster = roster.trim();

    if is_bare_initials(recorded) {
        return if roster.is_empty() {
            recorded.to_string()
        } else {
            jockey_short(roster)
        };
    }

    if recorded.is_empty() {
        jockey_short(roster)
    } else {
        jockey_short(recorded)
    }
}
