use unicode_normalization::UnicodeNormalization;

/// Canonical form of `text`: full decomposition followed by canonical
/// composition, so a composed Hangul syllable and its jamo sequence compare
/// equal.
pub fn normalize(text: &str) -> String {
    text.nfd().nfc().collect()
}
