use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{config::PasswordConfig, error::DaybookError, store::json_store::write_json_file};

use super::password;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
const AMBIGUOUS: &str = "0O1lI";
const HEX: &str = "0123456789abcdef";

const WORD_LISTS: &[&[&str]] = &[
    &[
        "red", "blue", "green", "yellow", "purple", "orange", "pink", "black", "white", "gray",
    ],
    &[
        "cat", "dog", "bird", "fish", "lion", "tiger", "bear", "wolf", "fox", "deer",
    ],
    &[
        "book", "chair", "table", "phone", "computer", "car", "house", "tree", "flower", "star",
    ],
];

/// Used when no listed word fits the requested passphrase length.
const FALLBACK_WORDS: &[&str] = &["word", "pass", "secure", "random", "crypto", "safety"];

#[derive(Debug, Clone, PartialEq)]
pub struct RandomOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
    pub exclude_ambiguous: bool,
}

impl From<&PasswordConfig> for RandomOptions {
    fn from(value: &PasswordConfig) -> Self {
        Self {
            length: value.default_length,
            uppercase: value.include_uppercase,
            lowercase: value.include_lowercase,
            digits: value.include_digits,
            symbols: value.include_symbols,
            exclude_ambiguous: value.exclude_ambiguous,
        }
    }
}

fn pick<T: Copy>(rng: &mut impl Rng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

fn chars_of(set: &str, exclude_ambiguous: bool) -> Vec<char> {
    set.chars()
        .filter(|c| !exclude_ambiguous || !AMBIGUOUS.contains(*c))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A random password containing at least one character of every enabled class.
pub fn random_password(options: &RandomOptions) -> Result<String> {
    if options.length < 4 {
        return Err(DaybookError::InvalidPasswordOptions(
            "password length must be at least 4".into(),
        )
        .into());
    }

    let classes = [
        (options.lowercase, LOWERCASE),
        (options.uppercase, UPPERCASE),
        (options.digits, DIGITS),
        (options.symbols, SYMBOLS),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .map(|(_, set)| chars_of(set, options.exclude_ambiguous))
    .collect::<Vec<_>>();
    if classes.is_empty() {
        return Err(DaybookError::InvalidPasswordOptions(
            "at least one character type must be included".into(),
        )
        .into());
    }

    let mut rng = rand::rng();
    let pool = classes.concat();
    let mut password = classes
        .iter()
        .map(|class| pick(&mut rng, class))
        .collect::<Vec<_>>();
    while password.len() < options.length {
        password.push(pick(&mut rng, &pool));
    }
    password.shuffle(&mut rng);
    Ok(password.into_iter().collect())
}

/// Words from the built in lists joined by `separator`, optionally followed by two digits.
pub fn memorable_password(
    words: usize,
    separator: &str,
    include_numbers: bool,
    capitalize_words: bool,
) -> String {
    let mut rng = rand::rng();
    let chosen = (0..words)
        .map(|_| {
            let list = pick(&mut rng, WORD_LISTS);
            let word = pick(&mut rng, list);
            if capitalize_words {
                capitalize(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>();
    let mut password = chosen.join(separator);
    if include_numbers {
        for _ in 0..2 {
            password.push(pick(&mut rng, &chars_of(DIGITS, false)));
        }
    }
    password
}

/// Capitalized words separated by spaces, limited to words with length in `min_len..=max_len`.
pub fn passphrase(words: usize, min_len: usize, max_len: usize) -> String {
    let mut pool = WORD_LISTS
        .iter()
        .flat_map(|list| list.iter())
        .filter(|word| (min_len..=max_len).contains(&word.len()))
        .copied()
        .collect::<Vec<_>>();
    if pool.len() < words {
        pool = FALLBACK_WORDS.to_vec();
    }

    let mut rng = rand::rng();
    (0..words)
        .map(|_| capitalize(pick(&mut rng, &pool)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn pin(length: usize) -> Result<String> {
    if length < 1 {
        return Err(
            DaybookError::InvalidPasswordOptions("PIN length must be at least 1".into()).into(),
        );
    }
    let digits = chars_of(DIGITS, false);
    let mut rng = rand::rng();
    Ok((0..length).map(|_| pick(&mut rng, &digits)).collect())
}

pub fn hex_password(length: usize) -> Result<String> {
    if length < 4 {
        return Err(DaybookError::InvalidPasswordOptions(
            "hex password length must be at least 4".into(),
        )
        .into());
    }
    let hex = chars_of(HEX, false);
    let mut rng = rand::rng();
    Ok((0..length).map(|_| pick(&mut rng, &hex)).collect())
}

/// `L` lowercase, `U` uppercase, `D` digit, `S` symbol, `X` any letter or digit. Every other
/// character is copied as is.
pub fn from_pattern(pattern: &str) -> String {
    let lowercase = chars_of(LOWERCASE, false);
    let uppercase = chars_of(UPPERCASE, false);
    let digits = chars_of(DIGITS, false);
    let symbols = chars_of(SYMBOLS, false);
    let alphanumeric = [lowercase.as_slice(), &uppercase, &digits].concat();

    let mut rng = rand::rng();
    pattern
        .chars()
        .map(|c| match c {
            'L' => pick(&mut rng, &lowercase),
            'U' => pick(&mut rng, &uppercase),
            'D' => pick(&mut rng, &digits),
            'S' => pick(&mut rng, &symbols),
            'X' => pick(&mut rng, &alphanumeric),
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPassword {
    pub password: String,
    pub strength: String,
    pub score: u8,
}

/// Several random passwords, strongest first.
pub fn multiple_passwords(count: usize, options: &RandomOptions) -> Result<Vec<GeneratedPassword>> {
    let mut generated = (0..count)
        .map(|_| {
            let password = random_password(options)?;
            let analysis = password::analyze(&password)?;
            Ok(GeneratedPassword {
                password,
                strength: analysis.strength.to_string(),
                score: analysis.score,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    generated.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(generated)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedPasswords {
    pub generated_at: NaiveDateTime,
    pub passwords: Vec<GeneratedPassword>,
}

pub async fn save_passwords(path: &Path, passwords: &[GeneratedPassword]) -> Result<()> {
    let saved = SavedPasswords {
        generated_at: Local::now().naive_local(),
        passwords: passwords.to_vec(),
    };
    write_json_file(path, &saved).await
}
