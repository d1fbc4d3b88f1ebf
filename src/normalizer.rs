//! C6 — Text Normalizer.
//!
//! A pure (string -> string), deterministic prose rewriter: cleaning,
//! optional filler removal, contraction expansion, sentence splitting,
//! capitalization/proper-noun fixups, question detection, and paragraphing.
//! Grounded on the original implementation's text processors
//! (`post_processing/text_processor.py`, `advanced_text_processor.py`), which
//! exposed two overlapping normalizers; per the design notes those collapse
//! into one pipeline here, gated by flags instead of a second class.

use regex::Regex;
use std::sync::LazyLock;

use crate::lexicon::ProperNounLexicon;

const FILLER_PHRASES: &[&str] = &["you know", "i mean", "sort of", "kind of"];
const FILLER_WORDS: &[&str] = &["um", "uh", "umm", "uhh", "er", "erm"];
const STRONG_STARTERS: &[&str] = &[
    "and", "but", "so", "however", "therefore", "meanwhile", "then", "also",
];
const QUESTION_STARTERS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "is", "are", "do", "does", "did", "can",
    "could", "would", "will", "should",
];
const TRANSITION_WORDS: &[&str] = &["however", "meanwhile", "therefore", "furthermore", "moreover"];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\[(][^\])]*[\])]").unwrap());
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+\s*").unwrap());

pub struct NormalizerOpts<'a> {
    pub remove_fillers: bool,
    pub lexicon: &'a dyn ProperNounLexicon,
}

pub fn normalize(text: &str, opts: &NormalizerOpts) -> String {
    let text = clean_basic(text);
    let text = if opts.remove_fillers { remove_fillers(&text) } else { text };
    let text = expand_contractions(&text);
    let text = dedupe_repeated_words(&text);
    let sentences = split_sentences(&text);

    let mut finished = Vec::with_capacity(sentences.len());
    let mut sentence_count_in_paragraph = 0usize;
    let mut paragraphs: Vec<Vec<String>> = vec![Vec::new()];

    for raw in sentences {
        let sentence = finish_sentence(&raw, opts.lexicon);
        let is_transition = starts_with_any(&raw, TRANSITION_WORDS);

        if sentence_count_in_paragraph >= 5 || (is_transition && sentence_count_in_paragraph >= 3) {
            paragraphs.push(Vec::new());
            sentence_count_in_paragraph = 0;
        }

        paragraphs.last_mut().unwrap().push(sentence.clone());
        finished.push(sentence);
        sentence_count_in_paragraph += 1;
    }

    paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn clean_basic(text: &str) -> String {
    let no_brackets = BRACKETED.replace_all(text, "");
    WHITESPACE.replace_all(no_brackets.trim(), " ").into_owned()
}

fn remove_fillers(text: &str) -> String {
    let mut stripped_phrases = text.to_owned();
    for phrase in FILLER_PHRASES {
        let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase))).unwrap();
        stripped_phrases = re.replace_all(&stripped_phrases, "").into_owned();
    }
    let words: Vec<&str> = stripped_phrases.split_whitespace().collect();
    let mut out = Vec::with_capacity(words.len());
    for (i, &word) in words.iter().enumerate() {
        let stripped = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if FILLER_WORDS.contains(&stripped.as_str()) {
            continue;
        }
        // Preserve verbal "like" (preceded by a pronoun/modal) vs. filler "like".
        if stripped == "like" {
            let prev = words.get(i.wrapping_sub(1)).map(|w| w.to_lowercase());
            let verbal = matches!(prev.as_deref(), Some("i") | Some("you") | Some("we") | Some("they") | Some("would") | Some("do"));
            if !verbal {
                continue;
            }
        }
        out.push(word);
    }
    WHITESPACE.replace_all(&out.join(" "), " ").trim().to_owned()
}

fn expand_contractions(text: &str) -> String {
    const PAIRS: &[(&str, &str)] = &[
        ("gonna", "going to"),
        ("wanna", "want to"),
        ("gotta", "got to"),
        ("kinda", "kind of"),
        ("cause", "because"),
    ];
    let mut out = text.to_owned();
    for (from, to) in PAIRS {
        let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(from))).unwrap();
        out = re.replace_all(&out, *to).into_owned();
    }
    out
}

fn dedupe_repeated_words(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        let dup = out
            .last()
            .is_some_and(|prev| prev.eq_ignore_ascii_case(word));
        if !dup {
            out.push(word);
        }
    }
    out.join(" ")
}

fn split_sentences(text: &str) -> Vec<String> {
    if SENTENCE_BOUNDARY.is_match(text) {
        return SENTENCE_BOUNDARY
            .split(text)
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // No punctuation present: fall back to word-count heuristics.
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        current.push(word);
        let count = current.len();
        let next_is_strong_starter = false; // lookahead isn't needed: we break *before* adding a starter below.
        let _ = next_is_strong_starter;

        let should_break = count >= 25
            || (count >= 15 && is_pronoun(word))
            || (count >= 8 && starts_with_any(word, STRONG_STARTERS));

        if should_break {
            sentences.push(current.join(" "));
            current = Vec::new();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }
    sentences
}

fn is_pronoun(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "i" | "you" | "he" | "she" | "we" | "they" | "it"
    )
}

fn starts_with_any(text: &str, words: &[&str]) -> bool {
    text.split_whitespace()
        .next()
        .map(|w| words.contains(&w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase().as_str()))
        .unwrap_or(false)
}

fn finish_sentence(sentence: &str, lexicon: &dyn ProperNounLexicon) -> String {
    let words: Vec<String> = sentence
        .split_whitespace()
        .map(|w| fixup_word(w, lexicon))
        .collect();
    let mut joined = words.join(" ");
    if let Some(first) = joined.chars().next() {
        if first.is_alphabetic() {
            let mut chars = joined.chars();
            let upper: String = chars.next().unwrap().to_uppercase().collect();
            joined = format!("{upper}{}", chars.as_str());
        }
    }

    let terminator = if is_question(sentence) { "?" } else { "." };
    if joined.ends_with(['.', '!', '?']) {
        joined
    } else {
        format!("{joined}{terminator}")
    }
}

fn fixup_word(word: &str, lexicon: &dyn ProperNounLexicon) -> String {
    let after_lead = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let lead = &word[..word.len() - after_lead.len()];
    let core = after_lead.trim_end_matches(|c: char| !c.is_alphanumeric());
    let trail = &after_lead[core.len()..];

    if core.is_empty() {
        return word.to_owned();
    }
    if core.eq_ignore_ascii_case("i") {
        return format!("{lead}I{trail}");
    }
    if let Some(canon) = lexicon.canonicalize(core) {
        return format!("{lead}{canon}{trail}");
    }
    word.to_owned()
}

fn is_question(sentence: &str) -> bool {
    let first = sentence.split_whitespace().next().unwrap_or("").to_lowercase();
    if QUESTION_STARTERS.contains(&first.as_str()) {
        return true;
    }
    let lowered = sentence.to_lowercase();
    ["is it", "do you", "are you", "can you", "did you"]
        .iter()
        .any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::StaticLexicon;

    fn opts(lexicon: &dyn ProperNounLexicon, remove_fillers: bool) -> NormalizerOpts<'_> {
        NormalizerOpts { remove_fillers, lexicon }
    }

    #[test]
    fn capitalizes_and_terminates_sentences() {
        let lex = StaticLexicon::default();
        let out = normalize("hello there", &opts(&lex, true));
        assert_eq!(out, "Hello there.");
    }

    #[test]
    fn removes_filler_words_when_enabled() {
        let lex = StaticLexicon::default();
        let out = normalize("um hello uh there", &opts(&lex, true));
        assert_eq!(out, "Hello there.");
    }

    #[test]
    fn keeps_filler_words_when_disabled() {
        let lex = StaticLexicon::default();
        let out = normalize("um hello", &opts(&lex, false));
        assert!(out.to_lowercase().contains("um"));
    }

    #[test]
    fn expands_contractions() {
        let lex = StaticLexicon::default();
        let out = normalize("i am gonna go", &opts(&lex, true));
        assert!(out.contains("going to"));
    }

    #[test]
    fn detects_question() {
        let lex = StaticLexicon::default();
        let out = normalize("are you coming", &opts(&lex, true));
        assert!(out.ends_with('?'));
    }

    #[test]
    fn is_idempotent() {
        let lex = StaticLexicon::default();
        let once = normalize("hello there, this is paris in the usa.", &opts(&lex, true));
        let twice = normalize(&once, &opts(&lex, true));
        assert_eq!(once, twice);
    }

    #[test]
    fn deduplicates_immediately_repeated_words() {
        let lex = StaticLexicon::default();
        let out = normalize("the the cat sat sat down", &opts(&lex, true));
        assert_eq!(out, "The cat sat down.");
    }
}
