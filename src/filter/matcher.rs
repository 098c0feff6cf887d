use super::error::FilterError;
use super::parser::{FilterSpec, MatchKind, Mode, Rule, Step};
use colored::Colorize;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

static QUALIFIED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*(\.[\p{L}_$][\p{L}\p{N}_$]*)*$")
        .expect("valid qualified name regex")
});

impl Rule {
    /// Test a class name against this rule, ignoring polarity
    pub fn matches(&self, class_name: &str) -> bool {
        match self {
            Rule::ExactReject(name) | Rule::ExactAccept(name) => class_name == name,
            Rule::PackageReject(package) | Rule::PackageAccept(package) => {
                class_name.starts_with(package.as_str())
                    && class_name.rfind('.').map(|i| i + 1) == Some(package.len())
            }
            Rule::HierarchyReject(prefix)
            | Rule::HierarchyAccept(prefix)
            | Rule::PrefixReject(prefix)
            | Rule::PrefixAccept(prefix) => class_name.starts_with(prefix.as_str()),
        }
    }
}

/// Why a class was admitted or rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecisionReason {
    /// The spec is empty, so filtering is disabled
    NoPolicy,
    /// A reject element matched
    Rejected { element: String },
    /// An accept element matched and no reject element did
    Accepted { element: String },
    /// Allowlist mode and no accept element matched
    NotListed,
    /// Blocklist mode and no reject element matched
    NotBlocked,
}

/// The outcome of classifying one class name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub class_name: String,
    pub admitted: bool,
    #[serde(flatten)]
    pub reason: DecisionReason,
}

enum Outcome {
    NoPolicy,
    Rejected(usize),
    Accepted(usize),
    NotListed,
    NotBlocked,
}

/// Decide whether `class_name` may be resolved under `spec`
pub fn apply(spec: &FilterSpec, class_name: &str) -> Result<bool, FilterError> {
    if class_name.is_empty() {
        return Err(FilterError::InvalidArgument);
    }
    Ok(match decide(spec, class_name) {
        Outcome::NoPolicy | Outcome::Accepted(_) | Outcome::NotBlocked => true,
        Outcome::Rejected(_) | Outcome::NotListed => false,
    })
}

/// Like [`apply`], but also reports which element was responsible
pub fn evaluate(spec: &FilterSpec, class_name: &str) -> Result<Decision, FilterError> {
    if class_name.is_empty() {
        return Err(FilterError::InvalidArgument);
    }
    let (admitted, reason) = match decide(spec, class_name) {
        Outcome::NoPolicy => (true, DecisionReason::NoPolicy),
        Outcome::Rejected(index) => (
            false,
            DecisionReason::Rejected {
                element: spec.describe(index),
            },
        ),
        Outcome::Accepted(index) => (
            true,
            DecisionReason::Accepted {
                element: spec.describe(index),
            },
        ),
        Outcome::NotListed => (false, DecisionReason::NotListed),
        Outcome::NotBlocked => (true, DecisionReason::NotBlocked),
    };
    Ok(Decision {
        class_name: class_name.to_string(),
        admitted,
        reason,
    })
}

fn decide(spec: &FilterSpec, class_name: &str) -> Outcome {
    if spec.is_empty() {
        return Outcome::NoPolicy;
    }

    let rules = spec.rules();
    let mut first_accept: Option<usize> = None;

    for step in &spec.plan {
        let hit = match *step {
            Step::ExactRejects => spec.exact_rejects.get(class_name).copied(),
            Step::ExactAccepts => spec.exact_accepts.get(class_name).copied(),
            Step::Single(index) => rules[index].matches(class_name).then_some(index),
        };
        let Some(index) = hit else {
            continue;
        };

        if rules[index].is_reject() {
            log::debug!(
                target: crate::LOG_TARGET,
                "Rejecting class '{}': matched filter element '{}'",
                class_name,
                spec.describe(index)
            );
            return Outcome::Rejected(index);
        }
        // a later reject may still override
        first_accept = Some(first_accept.map_or(index, |first| first.min(index)));
    }

    match (first_accept, spec.mode()) {
        (Some(index), _) => {
            log::trace!(
                target: crate::LOG_TARGET,
                "Admitting class '{}': matched filter element '{}'",
                class_name,
                spec.describe(index)
            );
            Outcome::Accepted(index)
        }
        (None, Mode::Allowlist) => {
            log::debug!(
                target: crate::LOG_TARGET,
                "Rejecting class '{}': not matched by any accept element of '{}'",
                class_name,
                spec.raw()
            );
            Outcome::NotListed
        }
        (None, Mode::Blocklist) => Outcome::NotBlocked,
    }
}

/// Check a compiled spec for elements that are legal but probably mistakes
pub fn filter_warnings(spec: &FilterSpec) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let rules = spec.rules();

    for (index, rule) in rules.iter().enumerate() {
        let Some(element) = spec.source_element(index) else {
            continue;
        };

        if !looks_qualified(rule) {
            warnings.push(format!(
                "Filter element '{}' does not look like a qualified class or package name",
                element
            ));
        }

        if !seen.insert(rule.element()) {
            warnings.push(format!("Filter element '{}' is listed more than once", element));
        }

        if !rule.is_reject()
            && let Some(reject) = rules
                .iter()
                .enumerate()
                .find(|(i, other)| spec.source_element(*i).is_some() && shadows(other, rule))
                .map(|(i, _)| spec.describe(i))
        {
            warnings.push(format!(
                "Filter element '{}' can never admit anything: every match is rejected by '{}'",
                element, reject
            ));
        }
    }

    warnings
}

/// Print warnings for suspicious elements to stderr
pub fn print_filter_warnings(spec: &FilterSpec) {
    for warning in filter_warnings(spec) {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }
}

fn looks_qualified(rule: &Rule) -> bool {
    let datum = rule.datum();
    match rule.kind() {
        MatchKind::Exact => QUALIFIED_NAME_RE.is_match(datum),
        MatchKind::Package | MatchKind::Hierarchy => datum
            .strip_suffix('.')
            .is_some_and(|package| QUALIFIED_NAME_RE.is_match(package)),
        // `a.*` compiles to a package rule, so a prefix never ends in '.'
        MatchKind::Prefix => datum.is_empty() || QUALIFIED_NAME_RE.is_match(datum),
    }
}

/// True when every class `accept` matches is also matched by `reject`
fn shadows(reject: &Rule, accept: &Rule) -> bool {
    if !reject.is_reject() || accept.is_reject() {
        return false;
    }
    match reject.kind() {
        MatchKind::Hierarchy | MatchKind::Prefix => accept.datum().starts_with(reject.datum()),
        MatchKind::Package => match accept.kind() {
            MatchKind::Exact => reject.matches(accept.datum()),
            MatchKind::Package => accept.datum() == reject.datum(),
            MatchKind::Hierarchy | MatchKind::Prefix => false,
        },
        MatchKind::Exact => accept.kind() == MatchKind::Exact && accept.datum() == reject.datum(),
    }
}
