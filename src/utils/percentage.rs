use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || !value.is_finite() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    pub fn zero() -> Percentage {
        Percentage(0.)
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `value` in `whole`. A zero whole yields 0%.
pub fn share_percentage(value: f64, whole: f64) -> Percentage {
    if whole <= 0. {
        return Percentage::zero();
    }
    Percentage::new_opt(value / whole * 100.).unwrap_or_else(Percentage::zero)
}

#[cfg(test)]
mod tests {
    use super::{share_percentage, Percentage};

    #[test]
    fn share_of_empty_whole_is_zero() {
        assert_eq!(share_percentage(10., 0.), Percentage::zero());
    }

    #[test]
    fn share_is_formatted_with_one_decimal() {
        assert_eq!(share_percentage(1., 3.).to_string(), "33.3%");
    }

    #[test]
    fn parse_accepts_trailing_percent() {
        let parsed: Percentage = "12.5%".parse().unwrap();
        assert_eq!(*parsed, 12.5);
        assert!("-3".parse::<Percentage>().is_err());
    }
}
