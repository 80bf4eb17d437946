use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::Subcommand;

use crate::{
    config::Config,
    security::{
        generator::{
            from_pattern, hex_password, memorable_password, multiple_passwords, passphrase, pin,
            random_password, save_passwords, RandomOptions,
        },
        password::{analyze, MAX_SCORE},
    },
};

#[derive(Debug, Subcommand)]
pub enum PasswordCommand {
    #[command(about = "Analyze the strength of a password. Asks for it when not given")]
    Check { password: Option<String> },
    #[command(about = "Generate random passwords. Defaults come from the configuration")]
    Generate {
        #[arg(short, long)]
        length: Option<usize>,
        #[arg(short, long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        no_uppercase: bool,
        #[arg(long)]
        no_lowercase: bool,
        #[arg(long)]
        no_digits: bool,
        #[arg(long)]
        no_symbols: bool,
        #[arg(long, help = "Leave out 0, O, 1, l and I")]
        exclude_ambiguous: bool,
        #[arg(long, help = "Save the generated passwords into a JSON file")]
        save: Option<PathBuf>,
    },
    #[command(about = "Words joined by a separator, followed by two digits")]
    Memorable {
        #[arg(short, long)]
        words: Option<usize>,
        #[arg(short, long)]
        separator: Option<String>,
        #[arg(long)]
        no_numbers: bool,
        #[arg(long)]
        no_capitalize: bool,
    },
    #[command(about = "Capitalized words separated by spaces")]
    Passphrase {
        #[arg(short, long, default_value_t = 4)]
        words: usize,
        #[arg(long, default_value_t = 4)]
        min_len: usize,
        #[arg(long, default_value_t = 8)]
        max_len: usize,
    },
    #[command(about = "Numeric PIN")]
    Pin {
        #[arg(short, long)]
        length: Option<usize>,
    },
    #[command(about = "Lower-case hexadecimal string")]
    Hex {
        #[arg(short, long, default_value_t = 16)]
        length: usize,
    },
    #[command(
        about = "Password following a pattern: L lower, U upper, D digit, S symbol, X letter or digit"
    )]
    Pattern { pattern: String },
}

/// Prompts on stdout and reads one line from stdin.
pub fn read_secret(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_analysis(password: &str) -> Result<()> {
    let analysis = analyze(password)?;
    println!(
        "Strength: {} ({}/{MAX_SCORE})",
        analysis.strength, analysis.score
    );
    println!("Length: {}", analysis.length);
    println!("Entropy: {:.1} bits", analysis.entropy);
    let variety = analysis.variety;
    for (present, label) in [
        (variety.lowercase, "lowercase"),
        (variety.uppercase, "uppercase"),
        (variety.digits, "digits"),
        (variety.special, "special characters"),
    ] {
        println!("  {} {label}", if present { "✓" } else { "✗" });
    }
    if analysis.is_common {
        println!("⚠️ This is a commonly used password");
    }
    if !analysis.common_patterns.is_empty() {
        println!("Patterns: {}", analysis.common_patterns.join(", "));
    }
    if !analysis.repeated_chars.is_empty() {
        println!("Repeated characters: {}", analysis.repeated_chars.join(", "));
    }
    if !analysis.repeated_sequences.is_empty() {
        println!("Repeated sequences: {}", analysis.repeated_sequences.join(", "));
    }
    if !analysis.dictionary_words.is_empty() {
        println!("Dictionary words: {}", analysis.dictionary_words.join(", "));
    }
    println!("Estimated time to crack:");
    for crack_time in &analysis.crack_times {
        println!("  {:<20} {}", crack_time.scenario, crack_time.estimate);
    }
    let recommendations = analysis.recommendations();
    if !recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in recommendations {
            println!("  - {recommendation}");
        }
    }
    Ok(())
}

pub async fn process_password_command(command: PasswordCommand, config: &Config) -> Result<()> {
    let defaults = &config.password;
    match command {
        PasswordCommand::Check { password } => {
            let password = match password {
                Some(v) => v,
                None => read_secret("Password: ")?,
            };
            print_analysis(&password)?;
        }
        PasswordCommand::Generate {
            length,
            count,
            no_uppercase,
            no_lowercase,
            no_digits,
            no_symbols,
            exclude_ambiguous,
            save,
        } => {
            let configured = RandomOptions::from(defaults);
            let options = RandomOptions {
                length: length.unwrap_or(configured.length),
                uppercase: configured.uppercase && !no_uppercase,
                lowercase: configured.lowercase && !no_lowercase,
                digits: configured.digits && !no_digits,
                symbols: configured.symbols && !no_symbols,
                exclude_ambiguous: configured.exclude_ambiguous || exclude_ambiguous,
            };
            if count <= 1 && save.is_none() {
                println!("{}", random_password(&options)?);
                return Ok(());
            }
            let generated = multiple_passwords(count.max(1), &options)?;
            for (i, v) in generated.iter().enumerate() {
                println!("{}. {} ({}, {}/{MAX_SCORE})", i + 1, v.password, v.strength, v.score);
            }
            if let Some(path) = save {
                save_passwords(&path, &generated).await?;
                println!("Saved to {}", path.display());
            }
        }
        PasswordCommand::Memorable {
            words,
            separator,
            no_numbers,
            no_capitalize,
        } => {
            let separator = separator.unwrap_or_else(|| defaults.memorable_separator.clone());
            println!(
                "{}",
                memorable_password(
                    words.unwrap_or(defaults.memorable_words),
                    &separator,
                    !no_numbers,
                    !no_capitalize
                )
            );
        }
        PasswordCommand::Passphrase {
            words,
            min_len,
            max_len,
        } => println!("{}", passphrase(words, min_len, max_len)),
        PasswordCommand::Pin { length } => {
            println!("{}", pin(length.unwrap_or(defaults.pin_length))?)
        }
        PasswordCommand::Hex { length } => println!("{}", hex_password(length)?),
        PasswordCommand::Pattern { pattern } => println!("{}", from_pattern(&pattern)),
    }
    Ok(())
}
