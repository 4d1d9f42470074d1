use std::{
    collections::HashSet,
    sync::OnceLock,
};

use regex::Regex;

/// Garbled-Greek repair table. Sources are either legacy oxia codepoints or
/// base letter + combining mark sequences; targets are the precomposed tonos
/// forms Anki fields are expected to carry. Longer sources are probed first.
const REMAP: &[(&str, &str)] = &[
    // dialytika + acute, written as three codepoints
    ("\u{03b9}\u{0308}\u{0301}", "ΐ"),
    ("\u{03c5}\u{0308}\u{0301}", "ΰ"),
    // combining acute on a bare vowel
    ("\u{03b1}\u{0301}", "ά"),
    ("\u{03b5}\u{0301}", "έ"),
    ("\u{03b7}\u{0301}", "ή"),
    ("\u{03b9}\u{0301}", "ί"),
    ("\u{03bf}\u{0301}", "ό"),
    ("\u{03c5}\u{0301}", "ύ"),
    ("\u{03c9}\u{0301}", "ώ"),
    ("\u{0391}\u{0301}", "Ά"),
    ("\u{0395}\u{0301}", "Έ"),
    ("\u{0397}\u{0301}", "Ή"),
    ("\u{0399}\u{0301}", "Ί"),
    ("\u{039f}\u{0301}", "Ό"),
    ("\u{03a5}\u{0301}", "Ύ"),
    ("\u{03a9}\u{0301}", "Ώ"),
    // combining dialytika
    ("\u{03b9}\u{0308}", "ϊ"),
    ("\u{03c5}\u{0308}", "ϋ"),
    // Greek Extended oxia forms, visually identical to tonos
    ("\u{1f71}", "ά"),
    ("\u{1f73}", "έ"),
    ("\u{1f75}", "ή"),
    ("\u{1f77}", "ί"),
    ("\u{1f79}", "ό"),
    ("\u{1f7b}", "ύ"),
    ("\u{1f7d}", "ώ"),
    ("\u{1fbb}", "Ά"),
    ("\u{1fc9}", "Έ"),
    ("\u{1fcb}", "Ή"),
    ("\u{1fdb}", "Ί"),
    ("\u{1ff9}", "Ό"),
    ("\u{1feb}", "Ύ"),
    ("\u{1ffb}", "Ώ"),
    ("\u{1fd3}", "ΐ"),
    ("\u{1fe3}", "ΰ"),
];

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[^\s&;]{1,32};").unwrap())
}

/// Char positions (by char index, not byte) covered by `&...;` entity spans.
/// Characters inside a span are never remapped.
fn entity_positions(text: &str) -> HashSet<usize> {
    let byte_to_char: Vec<usize> = {
        let mut map = vec![0; text.len() + 1];
        for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
            map[byte_idx] = char_idx;
        }
        map[text.len()] = text.chars().count();
        map
    };

    let mut positions = HashSet::new();
    for m in entity_regex().find_iter(text) {
        for pos in byte_to_char[m.start()]..byte_to_char[m.end()] {
            positions.insert(pos);
        }
    }
    positions
}

/// Repairs mis-encoded Greek character sequences, leaving HTML entity spans
/// untouched. Unmapped characters pass through verbatim.
pub fn normalize(text: &str) -> String {
    let entity_spans = entity_positions(text);
    let chars: Vec<char> = text.chars().collect();

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if entity_spans.contains(&i) {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let mut matched = false;
        for (source, target) in REMAP {
            let len = source.chars().count();
            if i + len <= chars.len() && chars[i..i + len].iter().copied().eq(source.chars()) {
                out.push_str(target);
                i += len;
                matched = true;
                break;
            }
        }
        if !matched {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Decodes the HTML entities Anki actually writes into field text. Runs on
/// already-normalized text right before speech synthesis.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
