//! The two analytical structures owned by an RCA: the five-whys causal chain
//! and the cause-category (Ishikawa) diagram.
//!
//! Clients always submit either structure as a whole. The planning helpers
//! here turn such a submission into the rows to store, dropping blank entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Maximum depth of a causal chain.
pub const MAX_LEVEL: u8 = 5;

// ─── Causal chain ────────────────────────────────────────────────────────────

/// One step of the five-whys chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalEntry {
  pub entry_id: Uuid,
  pub rca_id:   Uuid,
  /// 1-based depth, at most [`MAX_LEVEL`].
  pub level:    u8,
  /// Fixed question text derived from the level.
  pub prompt:   String,
  pub answer:   Option<String>,
}

/// Input for appending a single causal-chain entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCausalEntry {
  pub level:  u8,
  pub answer: Option<String>,
}

impl NewCausalEntry {
  pub fn validate(&self) -> Result<()> { validate_level(self.level) }
}

pub fn validate_level(level: u8) -> Result<()> {
  if (1..=MAX_LEVEL).contains(&level) {
    Ok(())
  } else {
    Err(Error::invalid(
      "level",
      format!("must be between 1 and {MAX_LEVEL}, got {level}"),
    ))
  }
}

/// The question text stored alongside an answer at `level`.
pub fn prompt_for_level(level: u8) -> String { format!("Why {level}?") }

// ─── Cause categories ────────────────────────────────────────────────────────

/// The fixed vocabulary of contributing-factor categories.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CauseCategory {
  Machine,
  Method,
  Material,
  Man,
  Environment,
  Measurement,
}

/// One cause placed under a category of the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseEntry {
  pub entry_id:  Uuid,
  pub rca_id:    Uuid,
  pub category:  CauseCategory,
  pub cause:     String,
  pub sub_cause: Option<String>,
}

/// Input for appending a single cause entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCauseEntry {
  pub category:  CauseCategory,
  pub cause:     String,
  pub sub_cause: Option<String>,
}

impl NewCauseEntry {
  pub fn validate(&self) -> Result<()> {
    if is_blank(&self.cause) {
      return Err(Error::invalid("cause", "must not be blank"));
    }
    Ok(())
  }
}

/// Causes grouped by category, as submitted by clients.
pub type CauseMap = BTreeMap<CauseCategory, Vec<String>>;

// ─── Whole-structure submissions ─────────────────────────────────────────────

/// Optional replacements for both child collections.
///
/// `None` leaves a collection alone; `Some` (even an empty one) replaces it
/// entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
  /// Answers for levels 1, 2, … in order.
  pub causal_chain: Option<Vec<String>>,
  pub cause_map:    Option<CauseMap>,
}

impl Analysis {
  pub fn validate(&self) -> Result<()> {
    if let Some(chain) = &self.causal_chain
      && chain.len() > MAX_LEVEL as usize
    {
      return Err(Error::invalid(
        "causal_chain",
        format!("must have at most {MAX_LEVEL} answers, got {}", chain.len()),
      ));
    }
    Ok(())
  }
}

pub fn is_blank(s: &str) -> bool { s.trim().is_empty() }

/// A causal-chain row to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCausalEntry {
  pub level:  u8,
  pub prompt: String,
  pub answer: String,
}

/// Rows for a submitted chain: one per non-blank answer, tagged with its
/// 1-based position. Blank answers are dropped but still consume a level.
pub fn plan_causal_chain(answers: &[String]) -> Vec<PlannedCausalEntry> {
  answers
    .iter()
    .zip(1..=MAX_LEVEL)
    .filter(|(answer, _)| !is_blank(answer))
    .map(|(answer, level)| PlannedCausalEntry {
      level,
      prompt: prompt_for_level(level),
      answer: answer.clone(),
    })
    .collect()
}

/// Rows for a submitted diagram: one per non-blank cause, in category order.
pub fn plan_causes(map: &CauseMap) -> Vec<(CauseCategory, String)> {
  map
    .iter()
    .flat_map(|(category, causes)| {
      causes
        .iter()
        .filter(|c| !is_blank(c))
        .map(move |c| (*category, c.clone()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn blank_answers_are_dropped_but_keep_their_level() {
    let plan = plan_causal_chain(&strings(&["", "  ", "valid answer"]));
    assert_eq!(plan, vec![PlannedCausalEntry {
      level:  3,
      prompt: "Why 3?".into(),
      answer: "valid answer".into(),
    }]);
  }

  #[test]
  fn empty_chain_plans_nothing() {
    assert!(plan_causal_chain(&[]).is_empty());
  }

  #[test]
  fn causes_are_flattened_without_blanks() {
    let mut map = CauseMap::new();
    map.insert(CauseCategory::Method, strings(&["No procedure", " "]));
    map.insert(CauseCategory::Machine, strings(&["Worn bearing", "Misaligned belt"]));

    let plan = plan_causes(&map);
    assert_eq!(plan, vec![
      (CauseCategory::Machine, "Worn bearing".to_string()),
      (CauseCategory::Machine, "Misaligned belt".to_string()),
      (CauseCategory::Method, "No procedure".to_string()),
    ]);
  }

  #[test]
  fn chains_longer_than_five_are_rejected() {
    let analysis = Analysis {
      causal_chain: Some(strings(&["a", "b", "c", "d", "e", "f"])),
      cause_map:    None,
    };
    assert!(analysis.validate().is_err());
  }

  #[test]
  fn level_bounds() {
    assert!(validate_level(0).is_err());
    assert!(validate_level(1).is_ok());
    assert!(validate_level(5).is_ok());
    assert!(validate_level(6).is_err());
  }

  #[test]
  fn cause_map_deserialises_from_category_keys() {
    let map: CauseMap =
      serde_json::from_str(r#"{"machine":["Worn bearing"],"environment":[]}"#).unwrap();
    assert_eq!(map[&CauseCategory::Machine], vec!["Worn bearing".to_string()]);
    assert!(map[&CauseCategory::Environment].is_empty());
  }
}
