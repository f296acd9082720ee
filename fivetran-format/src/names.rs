//! Property and stream name normalization
//!
//! Every name the mapper emits goes through [`normalize`], which turns mixed
//! casing conventions into lower snake case:
//!
//! ```
//! use fivetran_format::normalize;
//!
//! assert_eq!(normalize("camelCase"), "camel_case");
//! assert_eq!(normalize("IPAddress"), "ip_address");
//! assert_eq!(normalize("UPPER_CASE"), "upper_case");
//! assert_eq!(normalize("a.b"), "a_b");
//! ```
//!
//! The input is split on `_` first so existing snake case survives, and each
//! segment is then run through a camelize/decamelize pair. Segments that are
//! entirely upper case are treated as acronyms and only lower-cased.

/// Normalize a raw property or stream name to its canonical snake-case form.
///
/// Total and pure. Idempotent on its own output.
pub fn normalize(name: &str) -> String {
    let segments: Vec<String> = name.split('_').map(normalize_segment).collect();
    segments.join("_").replace('.', "_")
}

fn normalize_segment(segment: &str) -> String {
    if is_upper(segment) {
        segment.to_lowercase()
    } else {
        decamelize(&camelize(segment))
    }
}

/// At least one cased character and no lower-case ones.
fn is_upper(s: &str) -> bool {
    let mut cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_numeric)
}

fn is_separator(c: char) -> bool {
    c == '-' || c == '_'
}

fn is_acronym_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// `kebab-case` / `PascalCase` -> `kebabCase` / `pascalCase`
fn camelize(s: &str) -> String {
    if is_upper(s) || is_numeric(s) {
        return s.to_string();
    }

    let mut chars: Vec<char> = s.chars().collect();
    if let Some(&first) = chars.first() {
        let head: String = chars.iter().take(2).collect();
        if !is_upper(&head) {
            let lowered: Vec<char> = first.to_lowercase().collect();
            chars.splice(0..1, lowered);
        }
    }

    // A separator run between two word characters is dropped and the
    // character after it upper-cased. Leading and trailing runs stay.
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_separator(c) && i > 0 && !is_separator(chars[i - 1]) {
            let mut j = i;
            while j < chars.len() && is_separator(chars[j]) {
                j += 1;
            }
            if j < chars.len() {
                out.extend(chars[j].to_uppercase());
                i = j + 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// `camelCase` -> `camel_case`
fn decamelize(s: &str) -> String {
    if is_upper(s) || is_numeric(s) {
        return s.to_string();
    }
    separate_words(&fix_abbreviations(s)).to_lowercase()
}

/// Title-case runs of capitals/digits so `IPAddress` splits as `Ip` + `Address`.
///
/// The last character of a run that does not end the string starts the next
/// word and is left untouched.
fn fix_abbreviations(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if !is_acronym_char(chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let mut j = i;
        while j < chars.len() && is_acronym_char(chars[j]) {
            j += 1;
        }
        let end = if j == chars.len() { j } else { j - 1 };
        push_title_case(&chars[i..end], &mut out);
        out.extend(&chars[end..j]);
        i = j;
    }
    out
}

fn push_title_case(run: &[char], out: &mut String) {
    let mut prev_cased = false;
    for &c in run {
        if c.is_ascii_alphabetic() {
            out.push(if prev_cased {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            });
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
}

/// Split before every ASCII capital and join the words with `_`.
fn separate_words(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let Some(first_upper) = chars.iter().position(char::is_ascii_uppercase) else {
        return s.to_string();
    };

    // separators directly in front of the first capital belong to its word
    let mut start = first_upper;
    while start > 0 && is_separator(chars[start - 1]) {
        start -= 1;
    }

    let mut words: Vec<String> = Vec::new();
    if start > 0 {
        words.push(chars[..start].iter().collect());
    }

    let mut current: String = chars[start..=first_upper].iter().collect();
    for &c in &chars[first_upper + 1..] {
        if c.is_ascii_uppercase() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    words.push(current);

    words.join("_")
}
