use std::sync::OnceLock;

use crate::core::ProphoraError;

/// Whitespace and sentence-ending punctuation become one join marker in the
/// filename stem; the sanitizer strips it again afterwards.
const JOIN_MARKER: char = ' ';

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ';', '·', '…'];

/// Base Greek -> Latin table, lowercase only. Digraphs are declared first;
/// the derived table is re-sorted longest-source-first anyway, so a unigraph
/// can never shadow a digraph at the same position. This is a closed table
/// purpose-built for one deck convention, not a general romanizer.
const BASE_TABLE: &[(&str, &str)] = &[
    ("ου", "ou"),
    ("ού", "ou"),
    ("αυ", "av"),
    ("αύ", "av"),
    ("ευ", "ev"),
    ("εύ", "ev"),
    ("μπ", "b"),
    ("ντ", "d"),
    ("γκ", "g"),
    ("γγ", "ng"),
    ("α", "a"),
    ("ά", "a"),
    ("β", "v"),
    ("γ", "g"),
    ("δ", "d"),
    ("ε", "e"),
    ("έ", "e"),
    ("ζ", "z"),
    ("η", "e"),
    ("ή", "e"),
    ("θ", "th"),
    ("ι", "i"),
    ("ί", "i"),
    ("ϊ", "i"),
    ("ΐ", "i"),
    ("κ", "k"),
    ("λ", "l"),
    ("μ", "m"),
    ("ν", "n"),
    ("ξ", "x"),
    ("ο", "o"),
    ("ό", "o"),
    ("π", "p"),
    ("ρ", "r"),
    ("σ", "s"),
    ("ς", "s"),
    ("τ", "t"),
    ("υ", "y"),
    ("ύ", "y"),
    ("ϋ", "y"),
    ("ΰ", "y"),
    ("φ", "f"),
    ("χ", "ch"),
    ("ψ", "ps"),
    ("ω", "o"),
    ("ώ", "o"),
];

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// The full closed mapping: base entries plus mechanically derived
/// fully-uppercased counterparts and, for two-character sources, a
/// capitalized-first-letter counterpart. Built once, sorted stable by
/// descending source length so longest matches are probed first; duplicate
/// sources (e.g. σ and ς both uppercasing to Σ) keep their first target.
fn table() -> &'static Vec<(String, String)> {
    static TABLE: OnceLock<Vec<(String, String)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut push = |source: String, target: String| {
            if !entries.iter().any(|(s, _)| *s == source) {
                entries.push((source, target));
            }
        };

        for (source, target) in BASE_TABLE {
            push(source.to_string(), target.to_string());
        }
        for (source, target) in BASE_TABLE {
            push(source.to_uppercase(), target.to_uppercase());
            if source.chars().count() == 2 {
                push(capitalize(source), capitalize(target));
            }
        }

        entries.sort_by_key(|(source, _)| std::cmp::Reverse(source.chars().count()));
        entries
    })
}

/// Converts normalized Greek text into a Latin filename stem. A character
/// with no table entry is fatal: a silently wrong filename would be worse
/// than stopping the run.
pub fn transliterate(text: &str) -> Result<String, ProphoraError> {
    let table = table();
    let chars: Vec<char> = text.chars().collect();

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || TERMINAL_PUNCTUATION.contains(&c) {
            if !out.is_empty() && !out.ends_with(JOIN_MARKER) {
                out.push(JOIN_MARKER);
            }
            i += 1;
            continue;
        }

        let mut matched = false;
        for (source, target) in table {
            let len = source.chars().count();
            if i + len <= chars.len() && chars[i..i + len].iter().copied().eq(source.chars()) {
                out.push_str(target);
                i += len;
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(ProphoraError::Transliteration { ch: c, context: text.to_string() });
        }
    }
    Ok(out)
}

/// Strips characters unsafe in portable media filenames. Pure; characters
/// are removed, not replaced.
pub fn sanitize_filename(stem: &str) -> String {
    stem.chars()
        .filter(|c| !matches!(c, ' ' | '.' | '?' | '!' | '\\' | '/' | '\u{a0}'))
        .collect()
}
