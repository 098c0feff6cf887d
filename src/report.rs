use crate::filter::{Decision, DecisionReason, FilterSpec, MatchKind, Polarity, filter_warnings};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, Table};
use serde_json::json;
use std::fmt::Write;

/// Label for the spec source shown in headers
pub fn spec_label(spec: &FilterSpec, is_default: bool) -> String {
    if is_default {
        "(built-in default)".to_string()
    } else if spec.raw().trim().is_empty() {
        "(empty, filtering disabled)".to_string()
    } else {
        format!("\"{}\"", spec.raw())
    }
}

pub fn format_decisions_text(decisions: &[Decision]) -> String {
    let mut out = String::new();
    let width = decisions
        .iter()
        .map(|d| d.class_name.len())
        .max()
        .unwrap_or(0);

    for decision in decisions {
        let verdict = if decision.admitted {
            "ADMIT ".green().bold()
        } else {
            "REJECT".red().bold()
        };
        let _ = writeln!(
            out,
            "{}  {:<width$}  {}",
            verdict,
            decision.class_name,
            describe_reason(&decision.reason).dimmed(),
            width = width
        );
    }

    let rejected = decisions.iter().filter(|d| !d.admitted).count();
    let _ = writeln!(
        out,
        "\n{} checked, {} admitted, {} rejected",
        decisions.len(),
        decisions.len() - rejected,
        rejected
    );
    out
}

pub fn format_decisions_json(spec: &FilterSpec, decisions: &[Decision]) -> String {
    serde_json::to_string_pretty(&json!({
        "spec": spec.raw(),
        "mode": spec.mode(),
        "decisions": decisions,
    }))
    .unwrap_or_else(|_| "{\"error\":\"failed to serialize decisions\"}".into())
}

fn describe_reason(reason: &DecisionReason) -> String {
    match reason {
        DecisionReason::NoPolicy => "filtering disabled".to_string(),
        DecisionReason::Rejected { element } => format!("rejected by '{}'", element),
        DecisionReason::Accepted { element } => format!("accepted by '{}'", element),
        DecisionReason::NotListed => "not on the allowlist".to_string(),
        DecisionReason::NotBlocked => "not on the blocklist".to_string(),
    }
}

pub fn format_explain_text(spec: &FilterSpec, is_default: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Spec:".bold(), spec_label(spec, is_default));
    let _ = writeln!(out, "{} {}", "Mode:".bold(), spec.mode());

    if spec.is_empty() {
        let _ = writeln!(out, "\nNo rules: every class is admitted.");
        return out;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["#", "Element", "Kind", "Polarity", "Matches"]);

    for (index, rule) in spec.rules().iter().enumerate() {
        let element = match spec.source_element(index) {
            Some(source) => source.to_string(),
            None => format!("{} (implicit)", rule.element()),
        };
        let polarity = match rule.polarity() {
            Polarity::Reject => Cell::new("reject").fg(Color::Red),
            Polarity::Accept => Cell::new("accept").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(element),
            Cell::new(rule.kind().canonical_name()),
            polarity,
            Cell::new(matches_description(rule.kind(), rule.datum())),
        ]);
    }

    let _ = writeln!(out, "\n{table}");

    let warnings = filter_warnings(spec);
    if !warnings.is_empty() {
        out.push('\n');
        for warning in warnings {
            let _ = writeln!(out, "{} {}", "Warning:".yellow().bold(), warning);
        }
    }
    out
}

fn matches_description(kind: MatchKind, datum: &str) -> String {
    match kind {
        MatchKind::Exact => format!("== {}", datum),
        MatchKind::Package => format!("classes directly in {}", datum.trim_end_matches('.')),
        MatchKind::Hierarchy => format!("{} and sub-packages", datum.trim_end_matches('.')),
        MatchKind::Prefix if datum.is_empty() => "every class".to_string(),
        MatchKind::Prefix => format!("starts with {}", datum),
    }
}

pub fn format_explain_json(spec: &FilterSpec, is_default: bool) -> String {
    let rules: Vec<_> = spec
        .rules()
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            json!({
                "element": spec.source_element(index).map(str::to_string).unwrap_or_else(|| rule.element()),
                "kind": rule.kind(),
                "polarity": rule.polarity(),
                "datum": rule.datum(),
                "implicit": spec.source_element(index).is_none(),
            })
        })
        .collect();

    serde_json::to_string_pretty(&json!({
        "spec": spec.raw(),
        "default": is_default,
        "mode": spec.mode(),
        "rules": rules,
        "warnings": filter_warnings(spec),
    }))
    .unwrap_or_else(|_| "{\"error\":\"failed to serialize spec\"}".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::evaluate;

    #[test]
    fn test_decisions_summary_line() {
        colored::control::set_override(false);
        let spec = FilterSpec::compile("!a.Bad").unwrap();
        let decisions = vec![
            evaluate(&spec, "a.Bad").unwrap(),
            evaluate(&spec, "a.Good").unwrap(),
        ];
        let text = format_decisions_text(&decisions);
        assert!(text.contains("rejected by '!a.Bad'"));
        assert!(text.contains("not on the blocklist"));
        assert!(text.contains("2 checked, 1 admitted, 1 rejected"));
    }

    #[test]
    fn test_explain_json_marks_implicit_rule() {
        let spec = FilterSpec::compile("com.acme.*").unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&format_explain_json(&spec, false)).unwrap();
        assert_eq!(value["mode"], "allowlist");
        assert_eq!(value["rules"][0]["kind"], "package");
        assert_eq!(value["rules"][0]["datum"], "com.acme.");
        assert_eq!(value["rules"][1]["implicit"], true);
        assert_eq!(value["rules"][1]["element"], "org.jboss.remotingjmx.**");
    }

    #[test]
    fn test_explain_text_for_disabled_filter() {
        colored::control::set_override(false);
        let spec = FilterSpec::compile("").unwrap();
        let text = format_explain_text(&spec, false);
        assert!(text.contains("(empty, filtering disabled)"));
        assert!(text.contains("every class is admitted"));
    }
}
