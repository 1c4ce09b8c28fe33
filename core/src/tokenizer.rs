use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this many UTF-8 bytes are never indexed.
pub const MIN_TERM_BYTES: usize = 3;

lazy_static! {
    // Letters, decimal digits and the accented Latin letters the corpus uses.
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{Nd}çáàãâéêíóôõúü]+").expect("valid regex");
    static ref STOPWORDS_PT: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","o","e","de","da","do","em","um","uma","que","com","no",
            "na","por","para","os","as","dos","das","ao","não","mas","se",
        ];
        words.iter().copied().collect()
    };
    static ref STOPWORDS_EN: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","the","and","or","but","of","in","on","at","to","for",
            "by","with","as","is","are","was","were","be","this","that","it",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS_PT.contains(token) || STOPWORDS_EN.contains(token)
}

/// Tokenize text into search terms: NFC normalization, lowercase, split on
/// non-word characters, then drop short tokens and stop words.
///
/// Order of the returned terms follows the input.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| token.len() >= MIN_TERM_BYTES)
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("O poeta é um fingidor.");
        assert_eq!(t, vec!["poeta", "fingidor"]);
    }

    #[test]
    fn decomposed_accents_match_precomposed() {
        assert_eq!(tokenize("cafe\u{301}"), tokenize("café"));
    }

    #[test]
    fn short_tokens_are_measured_in_bytes() {
        // An accented two-letter word is three bytes long and is kept.
        assert_eq!(tokenize("só já lá fé"), vec!["só", "já", "lá", "fé"]);
        assert!(tokenize("eu tu é").is_empty());
    }

    #[test]
    fn only_decimal_digits_join_words() {
        assert_eq!(tokenize("abc²def reiⅫ"), vec!["abc", "def", "rei"]);
        assert_eq!(tokenize("ano 1934"), vec!["ano", "1934"]);
    }
}
