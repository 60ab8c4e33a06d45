//! Case and quote helpers used when transforming and learning words.

/// Uppercases the first code point, leaves the rest untouched.
pub fn capitalize_first_code_point(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first code point, leaves the rest untouched.
pub fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn capitalize_first_and_downcase_rest(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

pub fn trailing_single_quotes_count(word: &str) -> usize {
    word.chars().rev().take_while(|&c| c == '\'').count()
}

pub fn is_lowercase_ascii(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase())
}

/// Words of a committed text, without empty pieces.
pub fn split_on_whitespace(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing() {
        assert_eq!(capitalize_first_code_point("élan"), "Élan");
        assert_eq!(capitalize_first_code_point("iPhone"), "IPhone");
        assert_eq!(decapitalize("Hello"), "hello");
        assert_eq!(decapitalize("USA"), "uSA");
        assert_eq!(capitalize_first_and_downcase_rest("hELLO"), "Hello");
        assert_eq!(capitalize_first_and_downcase_rest(""), "");
    }

    #[test]
    fn quotes_and_ascii() {
        assert_eq!(trailing_single_quotes_count("rock''"), 2);
        assert_eq!(trailing_single_quotes_count("it's"), 0);
        assert!(is_lowercase_ascii("hello"));
        assert!(!is_lowercase_ascii("héllo"));
        assert!(!is_lowercase_ascii("Hello"));
        assert_eq!(split_on_whitespace(" good  morning "), vec!["good", "morning"]);
    }
}
