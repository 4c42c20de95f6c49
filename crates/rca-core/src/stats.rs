//! Summary statistics over the RCA records.

use serde::{Deserialize, Serialize};

use crate::rca::{Criticality, RcaStatus};

/// Area label for records without one.
pub const UNASSIGNED_AREA: &str = "Unassigned";

/// One count per status value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub open:              u64,
  pub in_analysis:       u64,
  pub in_implementation: u64,
  pub closed:            u64,
  pub cancelled:         u64,
}

impl StatusCounts {
  pub fn add(&mut self, status: RcaStatus, n: u64) {
    let slot = match status {
      RcaStatus::Open => &mut self.open,
      RcaStatus::InAnalysis => &mut self.in_analysis,
      RcaStatus::InImplementation => &mut self.in_implementation,
      RcaStatus::Closed => &mut self.closed,
      RcaStatus::Cancelled => &mut self.cancelled,
    };
    *slot += n;
  }

  pub fn total(&self) -> u64 {
    self.open + self.in_analysis + self.in_implementation + self.closed + self.cancelled
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
  pub total:        u64,
  #[serde(flatten)]
  pub by_status:    StatusCounts,
  /// Records with [`Criticality::Critical`].
  pub critical:     u64,
  /// `closed / total × 100`, rounded to two decimals; 0 when there are no
  /// records.
  pub closure_rate: f64,
}

impl Summary {
  pub fn new(by_status: StatusCounts, critical: u64) -> Self {
    let total = by_status.total();
    Self {
      total,
      by_status,
      critical,
      closure_rate: closure_rate(by_status.closed, total),
    }
  }
}

pub fn closure_rate(closed: u64, total: u64) -> f64 {
  if total == 0 {
    return 0.0;
  }
  let pct = closed as f64 * 100.0 / total as f64;
  (pct * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSummary {
  pub area:   String,
  pub total:  u64,
  pub closed: u64,
  /// Everything not closed, cancelled records included.
  pub open:   u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalityCount {
  pub criticality: Criticality,
  pub total:       u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_records_have_zero_closure_rate() {
    let s = Summary::new(StatusCounts::default(), 0);
    assert_eq!(s.total, 0);
    assert_eq!(s.closure_rate, 0.0);
  }

  #[test]
  fn three_of_ten_closed_is_thirty_percent() {
    let mut counts = StatusCounts::default();
    counts.add(RcaStatus::Closed, 3);
    counts.add(RcaStatus::Open, 7);
    let s = Summary::new(counts, 2);
    assert_eq!(s.total, 10);
    assert_eq!(s.closure_rate, 30.0);
    assert_eq!(s.critical, 2);
  }

  #[test]
  fn closure_rate_rounds_to_two_decimals() {
    assert_eq!(closure_rate(1, 3), 33.33);
    assert_eq!(closure_rate(2, 3), 66.67);
  }

  #[test]
  fn summary_json_is_flat() {
    let mut counts = StatusCounts::default();
    counts.add(RcaStatus::InAnalysis, 1);
    let json = serde_json::to_value(Summary::new(counts, 0)).unwrap();
    assert_eq!(json["in_analysis"], 1);
    assert_eq!(json["total"], 1);
  }
}
