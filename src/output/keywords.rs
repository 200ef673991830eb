//! Hot-keyword export
//!
//! Persisted titles are tokenized, counted, and written as a keyword cloud
//! script (`window.hotKeywords = [...]`) that a static page can load. Runs of
//! CJK characters become overlapping bigrams; latin runs become lower-cased
//! words of at least two characters.

use super::{OutputError, OutputResult};
use crate::state::UNRESOLVED_TITLE;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Size given to the most frequent keyword
pub const MAX_KEYWORD_SIZE: u32 = 100;

/// One entry of the keyword cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotKeyword {
    pub text: String,
    pub size: u32,
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // kana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified
        | '\u{AC00}'..='\u{D7AF}' // hangul
        | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
    )
}

/// Splits a title into candidate keywords
pub fn tokenize(title: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cjk_run: Vec<char> = Vec::new();
    let mut word = String::new();

    let flush_cjk = |run: &mut Vec<char>, tokens: &mut Vec<String>| {
        for pair in run.windows(2) {
            tokens.push(pair.iter().collect());
        }
        run.clear();
    };
    let flush_word = |word: &mut String, tokens: &mut Vec<String>| {
        if word.chars().count() >= 2 {
            tokens.push(word.to_lowercase());
        }
        word.clear();
    };

    for c in title.chars() {
        if is_cjk(c) {
            flush_word(&mut word, &mut tokens);
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.push(c);
        } else {
            flush_cjk(&mut cjk_run, &mut tokens);
            flush_word(&mut word, &mut tokens);
        }
    }
    flush_cjk(&mut cjk_run, &mut tokens);
    flush_word(&mut word, &mut tokens);

    tokens
}

/// Counts keywords across titles and keeps the `top` most frequent
///
/// Ties are broken alphabetically so the output is stable. Sizes are scaled
/// so the most frequent keyword gets `MAX_KEYWORD_SIZE`.
pub fn compute_hot_keywords<'a, I>(titles: I, stopwords: &[String], top: usize) -> Vec<HotKeyword>
where
    I: IntoIterator<Item = &'a str>,
{
    let stopwords: HashSet<String> = stopwords.iter().map(|w| w.to_lowercase()).collect();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for title in titles {
        if title == UNRESOLVED_TITLE {
            continue;
        }
        for token in tokenize(title) {
            if !stopwords.contains(&token) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top);

    let max = ranked.first().map(|(_, count)| *count).unwrap_or(0);
    ranked
        .into_iter()
        .map(|(text, count)| {
            let scaled = (count as f64 * MAX_KEYWORD_SIZE as f64 / max as f64).round() as u32;
            HotKeyword {
                text,
                size: scaled.max(1),
            }
        })
        .collect()
}

/// Renders keywords as the script a keyword cloud page loads
pub fn format_keywords_script(keywords: &[HotKeyword]) -> OutputResult<String> {
    let json =
        serde_json::to_string_pretty(keywords).map_err(|e| OutputError::Format(e.to_string()))?;
    Ok(format!(
        "// hot.js - generated by board-harvest\nwindow.hotKeywords = {};\n",
        json
    ))
}

/// Writes the keyword script to `output_path`
pub fn write_keywords_script(keywords: &[HotKeyword], output_path: &Path) -> OutputResult<()> {
    let script = format_keywords_script(keywords)?;
    std::fs::write(output_path, script)?;
    Ok(())
}
