//! RCA aggregate → [`Report`] document model.

use chrono::{DateTime, Utc};
use rca_core::{analysis::is_blank, rca::RcaAggregate};

/// Printed in place of an absent value.
pub const NOT_AVAILABLE: &str = "N/A";

/// A formatted report, ready for serialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  /// Document heading, e.g. `RCA REPORT - RCA-2024-001`.
  pub heading:  String,
  /// The key-value summary table, in print order.
  pub fields:   Vec<Field>,
  /// Narrative sections; only non-blank ones are present.
  pub sections: Vec<Section>,
  pub footer:   String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  pub label: &'static str,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
  pub heading: &'static str,
  pub body:    String,
}

fn or_na(value: Option<&str>) -> String {
  match value {
    Some(v) if !is_blank(v) => v.to_owned(),
    _ => NOT_AVAILABLE.to_owned(),
  }
}

fn field(label: &'static str, value: String) -> Field { Field { label, value } }

/// Build the document model for `aggregate`. Pure: the same inputs always
/// yield the same report.
pub fn layout(aggregate: &RcaAggregate, generated_at: DateTime<Utc>) -> Report {
  let rca = &aggregate.rca;
  let f = &rca.fields;

  let fields = vec![
    field("Title", or_na(Some(f.title.as_str()))),
    field("Event date", f.event_at.format("%Y-%m-%d %H:%M").to_string()),
    field("Area", or_na(f.area.as_deref())),
    field("Equipment", or_na(f.equipment.as_deref())),
    field("Criticality", f.criticality.label().to_owned()),
    field("Status", f.status.label().to_owned()),
    field("Responsible", or_na(f.responsible.as_deref())),
  ];

  let sections = [
    ("Failure description", &f.failure_description),
    ("Root cause", &f.root_cause),
    ("Corrective actions", &f.corrective_actions),
  ]
  .into_iter()
  .filter_map(|(heading, body)| match body {
    Some(body) if !is_blank(body) => Some(Section { heading, body: body.clone() }),
    _ => None,
  })
  .collect();

  Report {
    heading: format!("RCA REPORT - {}", rca.code),
    fields,
    sections,
    footer: format!("Report generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
  }
}

/// Download name for the report of the record with `code`. Characters that
/// could break a `Content-Disposition` header become `_`.
pub fn file_name(code: &str) -> String {
  let safe: String = code
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
    .collect();
  format!("RCA_{safe}.pdf")
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use rca_core::rca::{Criticality, Rca, RcaFields, RcaStatus};
  use uuid::Uuid;

  use super::*;

  fn aggregate() -> RcaAggregate {
    let mut fields =
      RcaFields::new("Boiler feed pump trip", Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap());
    fields.area = Some("Utilities".into());
    fields.criticality = Criticality::High;
    fields.status = RcaStatus::InAnalysis;
    fields.root_cause = Some("Cavitation from low suction head".into());
    fields.failure_description = Some("   ".into());
    RcaAggregate {
      rca:          Rca {
        rca_id: Uuid::nil(),
        code: "RCA-2024-017".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        fields,
      },
      causal_chain: vec![],
      causes:       vec![],
    }
  }

  #[test]
  fn table_rows_use_na_for_missing_values() {
    let report = layout(&aggregate(), Utc::now());
    assert_eq!(report.heading, "RCA REPORT - RCA-2024-017");

    let rows: Vec<_> = report.fields.iter().map(|f| (f.label, f.value.as_str())).collect();
    assert_eq!(rows, [
      ("Title", "Boiler feed pump trip"),
      ("Event date", "2024-06-03 14:30"),
      ("Area", "Utilities"),
      ("Equipment", NOT_AVAILABLE),
      ("Criticality", "High"),
      ("Status", "In Analysis"),
      ("Responsible", NOT_AVAILABLE),
    ]);
  }

  #[test]
  fn only_non_blank_sections_are_included() {
    let report = layout(&aggregate(), Utc::now());
    assert_eq!(report.sections, vec![Section {
      heading: "Root cause",
      body:    "Cavitation from low suction head".into(),
    }]);
  }

  #[test]
  fn footer_carries_generation_time() {
    let at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 5, 0).unwrap();
    let report = layout(&aggregate(), at);
    assert_eq!(report.footer, "Report generated: 2024-07-01 09:05:00");
  }

  #[test]
  fn file_name_is_header_safe() {
    assert_eq!(file_name("RCA-2024-017"), "RCA_RCA-2024-017.pdf");
    assert_eq!(file_name("a\"b/c"), "RCA_a_b_c.pdf");
  }
}
