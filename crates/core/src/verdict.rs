//! Accident-verdict parsing.
//!
//! The accident classifier is asked to answer "True" or "False" but is free
//! text in practice ("True.", "**true**", "The answer is True"). A response
//! counts as positive only when it contains the word `true`; everything
//! else, including an empty or garbled answer, is negative.

/// Token that marks a positive verdict.
pub const POSITIVE_TOKEN: &str = "true";

/// Returns `true` when the classifier response contains [`POSITIVE_TOKEN`]
/// as a whole word, ignoring case and punctuation.
pub fn parse_accident_verdict(response: &str) -> bool {
    response
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(POSITIVE_TOKEN))
}
