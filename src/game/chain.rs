//! The chain rule: a candidate word must begin with the sound the previous
//! word ended on, across two writing systems.

use super::phonetics::{
    Script, clean_reading, detect_script, expand_initial_variants, final_sound, first_sound,
};

/// Outcome of a chain check, carrying the sounds involved so rejections can
/// name exactly what was required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerdict {
    pub is_valid: bool,
    /// Accepted first sounds, joined with `/` when dueum alternation allows
    /// more than one.
    pub required: String,
    pub supplied: String,
}

/// Check the chain link between the previous accepted word (raw display form,
/// possibly annotated) and a candidate's canonical reading.
pub fn verify_chain(previous_raw: &str, candidate_reading: &str) -> ChainVerdict {
    match detect_script(previous_raw) {
        Script::Hangul => verify_korean(previous_raw, candidate_reading),
        Script::Japanese => verify_japanese(previous_raw, candidate_reading),
    }
}

fn verify_korean(previous_raw: &str, candidate: &str) -> ChainVerdict {
    let previous = clean_reading(previous_raw).trim();
    let supplied = candidate.trim().chars().next();

    let Some(last) = previous.chars().last() else {
        return ChainVerdict {
            is_valid: false,
            required: String::new(),
            supplied: supplied.map(String::from).unwrap_or_default(),
        };
    };

    let accepted = expand_initial_variants(last);
    let is_valid = supplied.is_some_and(|s| accepted.contains(&s));

    ChainVerdict {
        is_valid,
        required: accepted
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("/"),
        supplied: supplied.map(String::from).unwrap_or_default(),
    }
}

fn verify_japanese(previous_raw: &str, candidate: &str) -> ChainVerdict {
    let required = final_sound(previous_raw);
    let supplied = first_sound(candidate);

    ChainVerdict {
        is_valid: match (required, supplied) {
            (Some(r), Some(s)) => r == s,
            _ => false,
        },
        required: required.map(String::from).unwrap_or_default(),
        supplied: supplied.map(String::from).unwrap_or_default(),
    }
}
