//! Shared text normalization.
//!
//! Spam comments evade keyword filters with Unicode lookalikes and spacing
//! tricks ("ЅLОТ88", "s l o t 8 8"). The same normalization must run at
//! training and at prediction time, so this is a pure function with no
//! fitted state.

use unicode_normalization::UnicodeNormalization;

/// Normalizes comment text for feature extraction.
///
/// Applies, in order: lowercasing, homoglyph folding, Unicode NFKD
/// normalization, and whitespace collapsing.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let folded: String = lowered.chars().map(fold_homoglyph).collect();
    let decomposed: String = folded.nfkd().collect();

    decomposed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps common Cyrillic and Greek lookalikes onto their Latin forms.
///
/// Fullwidth and mathematical-alphanumeric variants are not listed here;
/// NFKD already decomposes those.
const fn fold_homoglyph(c: char) -> char {
    match c {
        // Cyrillic
        'а' => 'a',
        'в' => 'b',
        'с' => 'c',
        'ԁ' => 'd',
        'е' | 'ё' | 'є' => 'e',
        'ѕ' => 's',
        'і' | 'ї' => 'i',
        'ј' => 'j',
        'к' => 'k',
        'м' => 'm',
        'н' => 'h',
        'о' => 'o',
        'р' => 'p',
        'т' => 't',
        'у' => 'y',
        'х' => 'x',
        'ԝ' => 'w',
        // Greek
        'α' => 'a',
        'β' => 'b',
        'ε' => 'e',
        'ι' => 'i',
        'κ' => 'k',
        'ν' => 'v',
        'ο' => 'o',
        'ρ' => 'p',
        'τ' => 't',
        'υ' => 'u',
        'χ' => 'x',
        _ => c,
    }
}
