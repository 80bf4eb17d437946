use std::{collections::BTreeSet, fmt::Display};

use anyhow::Result;
use tracing::debug;

use crate::error::DaybookError;

pub const MAX_SCORE: u8 = 12;

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "123456789",
    "qwerty",
    "abc123",
    "password123",
    "admin",
    "letmein",
    "welcome",
    "monkey",
    "1234567890",
    "password1",
    "qwerty123",
    "dragon",
    "master",
    "hello",
    "login",
    "welcome123",
];

const COMMON_PATTERNS: &[&str] = &[
    "123", "321", "abc", "qwe", "asd", "zxc", "111", "000", "password", "admin", "root", "user",
    "guest", "test",
];

const KEYBOARD_PATTERNS: &[&str] = &["qwerty", "asdf", "zxcv", "12345", "54321"];

const DICTIONARY_WORDS: &[&str] = &[
    "password", "admin", "user", "root", "guest", "test", "demo", "login", "access", "secret",
    "private", "secure", "system",
];

/// Guesses per second for each attack scenario.
const ATTACK_SCENARIOS: &[(&str, f64)] = &[
    ("Online Throttled", 1e3),
    ("Online Unthrottled", 1e6),
    ("Offline Slow", 1e8),
    ("Offline Fast", 1e10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
    VeryStrong,
}

impl Strength {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=3 => Strength::VeryWeak,
            4..=5 => Strength::Weak,
            6..=7 => Strength::Fair,
            8..=9 => Strength::Good,
            10..=11 => Strength::Strong,
            _ => Strength::VeryStrong,
        }
    }
}

impl Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Strength::VeryWeak => "Very Weak",
            Strength::Weak => "Weak",
            Strength::Fair => "Fair",
            Strength::Good => "Good",
            Strength::Strong => "Strong",
            Strength::VeryStrong => "Very Strong",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterVariety {
    pub lowercase: bool,
    pub uppercase: bool,
    pub digits: bool,
    /// ASCII punctuation only.
    pub special: bool,
}

impl CharacterVariety {
    pub fn of(password: &str) -> Self {
        Self {
            lowercase: password.chars().any(char::is_lowercase),
            uppercase: password.chars().any(char::is_uppercase),
            digits: password.chars().any(|c| c.is_ascii_digit()),
            special: password.chars().any(|c| c.is_ascii_punctuation()),
        }
    }

    fn charset_size(&self) -> u32 {
        [
            (self.lowercase, 26),
            (self.uppercase, 26),
            (self.digits, 10),
            (self.special, 32),
        ]
        .into_iter()
        .filter(|(present, _)| *present)
        .map(|(_, size)| size)
        .sum()
    }

    fn count(&self) -> u8 {
        [self.lowercase, self.uppercase, self.digits, self.special]
            .into_iter()
            .filter(|v| *v)
            .count() as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrackTime {
    pub scenario: &'static str,
    pub estimate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordAnalysis {
    pub length: usize,
    pub entropy: f64,
    pub variety: CharacterVariety,
    pub common_patterns: Vec<String>,
    /// Runs of three identical characters.
    pub repeated_chars: Vec<String>,
    /// Four character windows made of at most two distinct characters. Reported, not scored.
    pub repeated_sequences: Vec<String>,
    pub dictionary_words: Vec<String>,
    pub is_common: bool,
    pub crack_times: Vec<CrackTime>,
    pub score: u8,
    pub strength: Strength,
}

/// Bits of entropy assuming every character is drawn from the classes present in the password.
pub fn entropy(password: &str) -> f64 {
    let charset = CharacterVariety::of(password).charset_size();
    if charset == 0 {
        return 0.;
    }
    password.chars().count() as f64 * f64::from(charset).log2()
}

fn windows(password: &str, size: usize) -> Vec<String> {
    let chars = password.chars().collect::<Vec<_>>();
    chars
        .windows(size)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

fn found_in(lower: &str, candidates: &[&str]) -> Vec<String> {
    candidates
        .iter()
        .filter(|candidate| lower.contains(*candidate))
        .map(|candidate| candidate.to_string())
        .collect()
}

fn format_crack_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "forever".into();
    }
    if seconds < 60. {
        format!("{seconds:.1} seconds")
    } else if seconds < 3600. {
        format!("{:.1} minutes", seconds / 60.)
    } else if seconds < 86400. {
        format!("{:.1} hours", seconds / 3600.)
    } else if seconds < 31_536_000. {
        format!("{:.1} days", seconds / 86400.)
    } else {
        format!("{:.1} years", seconds / 31_536_000.)
    }
}

/// Average time to find the password by brute force, half of the search space.
pub fn estimate_crack_times(entropy: f64) -> Vec<CrackTime> {
    ATTACK_SCENARIOS
        .iter()
        .map(|&(scenario, rate)| CrackTime {
            scenario,
            estimate: format_crack_time(2f64.powf(entropy) / (2. * rate)),
        })
        .collect()
}

pub fn analyze(password: &str) -> Result<PasswordAnalysis> {
    if password.is_empty() {
        return Err(DaybookError::EmptyPassword.into());
    }

    let lower = password.to_lowercase();
    let length = password.chars().count();
    let entropy = entropy(password);
    let variety = CharacterVariety::of(password);

    let mut common_patterns = found_in(&lower, COMMON_PATTERNS);
    common_patterns.extend(
        found_in(&lower, KEYBOARD_PATTERNS)
            .into_iter()
            .map(|v| format!("keyboard pattern: {v}")),
    );

    let repeated_chars = windows(password, 3)
        .into_iter()
        .filter(|w| w.chars().collect::<BTreeSet<_>>().len() == 1)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let repeated_sequences = windows(password, 4)
        .into_iter()
        .filter(|w| w.chars().collect::<BTreeSet<_>>().len() <= 2)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let dictionary_words = found_in(&lower, DICTIONARY_WORDS);
    let is_common = COMMON_PASSWORDS.contains(&lower.as_str());

    let score = [
        length >= 8,
        length >= 12,
        length >= 16,
        entropy > 50.,
        entropy > 70.,
        common_patterns.is_empty(),
        repeated_chars.is_empty(),
        dictionary_words.is_empty(),
        !is_common,
    ]
    .into_iter()
    .filter(|v| *v)
    .count() as u8
        + variety.count();
    let score = score.min(MAX_SCORE);
    debug!("Password of length {length} scored {score}");

    Ok(PasswordAnalysis {
        length,
        entropy,
        variety,
        common_patterns,
        repeated_chars,
        repeated_sequences,
        dictionary_words,
        is_common,
        crack_times: estimate_crack_times(entropy),
        score,
        strength: Strength::from_score(score),
    })
}

impl PasswordAnalysis {
    pub fn recommendations(&self) -> Vec<String> {
        let mut recommendations = vec![];
        if self.length < 8 {
            recommendations.push("Use at least 8 characters".to_string());
        } else if self.length < 12 {
            recommendations.push("Consider using 12+ characters for better security".to_string());
        }

        let variety = self.variety;
        for (present, advice) in [
            (variety.lowercase, "Add lowercase letters"),
            (variety.uppercase, "Add uppercase letters"),
            (variety.digits, "Add numbers"),
            (variety.special, "Add special characters (!@#$%^&*)"),
        ] {
            if !present {
                recommendations.push(advice.to_string());
            }
        }

        if !self.common_patterns.is_empty() {
            recommendations.push(format!(
                "Avoid common patterns: {}",
                self.common_patterns.join(", ")
            ));
        }
        if !self.repeated_chars.is_empty() {
            recommendations.push("Avoid repeating the same character multiple times".to_string());
        }
        if !self.dictionary_words.is_empty() {
            recommendations.push(format!(
                "Avoid dictionary words: {}",
                self.dictionary_words.join(", ")
            ));
        }
        if self.is_common {
            recommendations
                .push("This is a commonly used password - choose something unique".to_string());
        }
        if self.entropy < 50. {
            recommendations.push("Increase password complexity for better entropy".to_string());
        }
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DaybookError;

    use super::{analyze, entropy, estimate_crack_times, Strength, MAX_SCORE};

    #[test]
    fn empty_password_is_an_error() {
        let err = analyze("").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaybookError>(),
            Some(DaybookError::EmptyPassword)
        ));
    }

    #[test]
    fn known_passwords_get_expected_labels() -> anyhow::Result<()> {
        let weak = analyze("123456")?;
        assert_eq!(weak.score, 3);
        assert_eq!(weak.strength, Strength::VeryWeak);
        assert!(weak.is_common);
        assert!(weak
            .common_patterns
            .contains(&"keyboard pattern: 12345".to_string()));

        let fair = analyze("Password123")?;
        assert_eq!(fair.score, 6);
        assert_eq!(fair.strength, Strength::Fair);
        assert_eq!(fair.dictionary_words, vec!["password".to_string()]);

        let strong = analyze("MyS3cur3P@ssw0rd!")?;
        assert_eq!(strong.score, MAX_SCORE);
        assert_eq!(strong.strength, Strength::VeryStrong);
        Ok(())
    }

    #[test]
    fn repeats_are_detected() -> anyhow::Result<()> {
        let analysis = analyze("aaab-xyxy")?;
        assert_eq!(analysis.repeated_chars, vec!["aaa".to_string()]);
        assert!(analysis.repeated_sequences.contains(&"aaab".to_string()));
        assert!(analysis.repeated_sequences.contains(&"xyxy".to_string()));
        Ok(())
    }

    #[test]
    fn entropy_uses_present_classes() {
        assert_eq!(entropy("!!!!"), 4. * 32f64.log2());
        assert_eq!(entropy("aB3"), 3. * 62f64.log2());
    }

    #[test]
    fn crack_time_units() {
        // 2^20 guesses, half of them on average.
        let times = estimate_crack_times(20.);
        assert_eq!(times[0].scenario, "Online Throttled");
        assert_eq!(times[0].estimate, "8.7 minutes");
        assert_eq!(times[3].estimate, "0.0 seconds");
        assert_eq!(estimate_crack_times(2000.)[0].estimate, "forever");
    }

    #[test]
    fn recommendations_follow_findings() -> anyhow::Result<()> {
        let recommendations = analyze("abc")?.recommendations();
        assert_eq!(
            recommendations,
            vec![
                "Use at least 8 characters",
                "Add uppercase letters",
                "Add numbers",
                "Add special characters (!@#$%^&*)",
                "Avoid common patterns: abc",
                "Increase password complexity for better entropy",
            ]
        );
        Ok(())
    }
}
