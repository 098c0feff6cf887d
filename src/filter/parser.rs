use super::defaults::CLIENT_SUPPORT_PACKAGE;
use super::error::FilterSpecError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const ELEMENT_SEPARATOR: char = ';';
const REJECT_MARKER: char = '!';
const WILDCARD: char = '*';
const PACKAGE_SEPARATOR: char = '.';
const RESERVED_CHARACTERS: [char; 2] = ['=', '/'];

/// Whether a matching rule admits or rejects the class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Accept,
    Reject,
}

/// How the compiled filter treats classes that no rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// At least one accept rule exists; unmatched classes are rejected
    Allowlist,
    /// Only reject rules exist; unmatched classes are admitted
    Blocklist,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Allowlist => write!(f, "allowlist"),
            Mode::Blocklist => write!(f, "blocklist"),
        }
    }
}

/// The matching strategy of a rule, independent of its polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// `a.b.C`
    Exact,
    /// `a.b.*`
    Package,
    /// `a.b.**`
    Hierarchy,
    /// `a.b.Pre*`
    Prefix,
}

impl MatchKind {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Package => "package",
            MatchKind::Hierarchy => "hierarchy",
            MatchKind::Prefix => "prefix",
        }
    }
}

/// A single compiled element of a filter specification.
///
/// Package and hierarchy data keep their trailing `.`, so `a.b.*` is stored as
/// `PackageAccept("a.b.")` and `!a.b.**` as `HierarchyReject("a.b.")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "datum", rename_all = "snake_case")]
pub enum Rule {
    ExactReject(String),
    ExactAccept(String),
    PackageReject(String),
    PackageAccept(String),
    HierarchyReject(String),
    HierarchyAccept(String),
    PrefixReject(String),
    PrefixAccept(String),
}

impl Rule {
    pub fn new(kind: MatchKind, polarity: Polarity, datum: impl Into<String>) -> Self {
        let datum = datum.into();
        match (kind, polarity) {
            (MatchKind::Exact, Polarity::Reject) => Rule::ExactReject(datum),
            (MatchKind::Exact, Polarity::Accept) => Rule::ExactAccept(datum),
            (MatchKind::Package, Polarity::Reject) => Rule::PackageReject(datum),
            (MatchKind::Package, Polarity::Accept) => Rule::PackageAccept(datum),
            (MatchKind::Hierarchy, Polarity::Reject) => Rule::HierarchyReject(datum),
            (MatchKind::Hierarchy, Polarity::Accept) => Rule::HierarchyAccept(datum),
            (MatchKind::Prefix, Polarity::Reject) => Rule::PrefixReject(datum),
            (MatchKind::Prefix, Polarity::Accept) => Rule::PrefixAccept(datum),
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Rule::ExactReject(_)
            | Rule::PackageReject(_)
            | Rule::HierarchyReject(_)
            | Rule::PrefixReject(_) => Polarity::Reject,
            Rule::ExactAccept(_)
            | Rule::PackageAccept(_)
            | Rule::HierarchyAccept(_)
            | Rule::PrefixAccept(_) => Polarity::Accept,
        }
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            Rule::ExactReject(_) | Rule::ExactAccept(_) => MatchKind::Exact,
            Rule::PackageReject(_) | Rule::PackageAccept(_) => MatchKind::Package,
            Rule::HierarchyReject(_) | Rule::HierarchyAccept(_) => MatchKind::Hierarchy,
            Rule::PrefixReject(_) | Rule::PrefixAccept(_) => MatchKind::Prefix,
        }
    }

    /// The class name, package or prefix this rule compares against
    pub fn datum(&self) -> &str {
        match self {
            Rule::ExactReject(d)
            | Rule::ExactAccept(d)
            | Rule::PackageReject(d)
            | Rule::PackageAccept(d)
            | Rule::HierarchyReject(d)
            | Rule::HierarchyAccept(d)
            | Rule::PrefixReject(d)
            | Rule::PrefixAccept(d) => d,
        }
    }

    pub fn is_reject(&self) -> bool {
        self.polarity() == Polarity::Reject
    }

    /// Rebuild the specification element this rule was compiled from
    pub fn element(&self) -> String {
        let marker = if self.is_reject() { "!" } else { "" };
        let suffix = match self.kind() {
            MatchKind::Exact => "",
            MatchKind::Package | MatchKind::Prefix => "*",
            MatchKind::Hierarchy => "**",
        };
        format!("{}{}{}", marker, self.datum(), suffix)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.element())
    }
}

/// Options that tune compilation without changing the grammar
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Package appended as a hierarchy accept rule whenever the spec is an allowlist.
    /// An empty value disables the implicit rule.
    pub client_support_package: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            client_support_package: CLIENT_SUPPORT_PACKAGE.to_string(),
        }
    }
}

/// One evaluation step. Exact rules of one polarity share a single set lookup
/// placed where the first of them was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Single(usize),
    ExactRejects,
    ExactAccepts,
}

/// An immutable, compiled filter specification
#[derive(Debug, Clone)]
pub struct FilterSpec {
    raw: String,
    rules: Vec<Rule>,
    sources: Vec<Option<String>>,
    mode: Mode,
    pub(crate) plan: Vec<Step>,
    pub(crate) exact_rejects: HashMap<String, usize>,
    pub(crate) exact_accepts: HashMap<String, usize>,
}

impl FilterSpec {
    /// Compile a specification using the default client support package
    pub fn compile(text: &str) -> Result<Self, FilterSpecError> {
        Self::compile_with(text, &CompileOptions::default())
    }

    /// Compile a specification string.
    ///
    /// Every element is validated here; a spec either compiles completely or
    /// not at all.
    pub fn compile_with(text: &str, options: &CompileOptions) -> Result<Self, FilterSpecError> {
        let mut spec = FilterSpec {
            raw: text.to_string(),
            rules: Vec::new(),
            sources: Vec::new(),
            mode: Mode::Blocklist,
            plan: Vec::new(),
            exact_rejects: HashMap::new(),
            exact_accepts: HashMap::new(),
        };

        for element in text
            .split(ELEMENT_SEPARATOR)
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            let rule = parse_element(element)?;
            spec.push(rule, Some(element.to_string()));
        }

        if spec.rules.iter().any(|rule| !rule.is_reject()) {
            spec.mode = Mode::Allowlist;
            let package = normalize_package(&options.client_support_package);
            if !package.is_empty() {
                spec.push(Rule::HierarchyAccept(package), None);
            }
        }

        log::trace!(
            target: crate::LOG_TARGET,
            "Compiled filter spec into {} rules ({} mode)",
            spec.rules.len(),
            spec.mode
        );

        Ok(spec)
    }

    fn push(&mut self, rule: Rule, source: Option<String>) {
        let index = self.rules.len();
        match &rule {
            Rule::ExactReject(name) => {
                if self.exact_rejects.is_empty() {
                    self.plan.push(Step::ExactRejects);
                }
                self.exact_rejects.entry(name.clone()).or_insert(index);
            }
            Rule::ExactAccept(name) => {
                if self.exact_accepts.is_empty() {
                    self.plan.push(Step::ExactAccepts);
                }
                self.exact_accepts.entry(name.clone()).or_insert(index);
            }
            _ => self.plan.push(Step::Single(index)),
        }
        self.rules.push(rule);
        self.sources.push(source);
    }

    /// The text this spec was compiled from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Rules in declaration order, including the implicit client support rule
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// True when no rules were compiled, i.e. filtering is disabled
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The specification element rule `index` was compiled from.
    /// `None` for the implicit client support rule.
    pub fn source_element(&self, index: usize) -> Option<&str> {
        self.sources.get(index).and_then(|s| s.as_deref())
    }

    /// Element text to report for rule `index`
    pub(crate) fn describe(&self, index: usize) -> String {
        match self.source_element(index) {
            Some(source) => source.to_string(),
            None => self.rules[index].element(),
        }
    }
}

fn normalize_package(package: &str) -> String {
    let package = package.trim();
    if package.is_empty() || package.ends_with(PACKAGE_SEPARATOR) {
        package.to_string()
    } else {
        format!("{}{}", package, PACKAGE_SEPARATOR)
    }
}

/// Parse a single non-empty, trimmed element
fn parse_element(element: &str) -> Result<Rule, FilterSpecError> {
    if let Some(character) = element.chars().find(|c| RESERVED_CHARACTERS.contains(c)) {
        return Err(FilterSpecError::ReservedCharacter {
            element: element.to_string(),
            character,
        });
    }

    let (polarity, body) = match element.strip_prefix(REJECT_MARKER) {
        Some(body) => (Polarity::Reject, body),
        None => (Polarity::Accept, element),
    };
    if body.is_empty() {
        return Err(FilterSpecError::EmptyRejectElement);
    }

    let misplaced = || FilterSpecError::MisplacedWildcard {
        element: element.to_string(),
    };

    let Some(wildcard) = body.find(WILDCARD) else {
        return Ok(Rule::new(MatchKind::Exact, polarity, body));
    };

    if let Some(package) = body.strip_suffix(".**") {
        if package.contains(WILDCARD) {
            return Err(misplaced());
        }
        if package.is_empty() {
            return Err(FilterSpecError::EmptyHierarchy {
                element: element.to_string(),
            });
        }
        // keep the trailing separator
        return Ok(Rule::new(
            MatchKind::Hierarchy,
            polarity,
            &body[..body.len() - 2],
        ));
    }

    if wildcard != body.len() - 1 {
        return Err(misplaced());
    }

    let prefix = &body[..wildcard];
    let kind = if prefix.ends_with(PACKAGE_SEPARATOR) {
        MatchKind::Package
    } else {
        MatchKind::Prefix
    };
    Ok(Rule::new(kind, polarity, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_elements() {
        assert_eq!(
            parse_element("com.example.Foo").unwrap(),
            Rule::ExactAccept("com.example.Foo".to_string())
        );
        assert_eq!(
            parse_element("!com.example.Foo").unwrap(),
            Rule::ExactReject("com.example.Foo".to_string())
        );
    }

    #[test]
    fn test_parse_wildcard_forms() {
        assert_eq!(
            parse_element("com.example.*").unwrap(),
            Rule::PackageAccept("com.example.".to_string())
        );
        assert_eq!(
            parse_element("!com.example.**").unwrap(),
            Rule::HierarchyReject("com.example.".to_string())
        );
        assert_eq!(
            parse_element("com.example.Abstract*").unwrap(),
            Rule::PrefixAccept("com.example.Abstract".to_string())
        );
        assert_eq!(parse_element("*").unwrap(), Rule::PrefixAccept(String::new()));
        assert_eq!(parse_element("!*").unwrap(), Rule::PrefixReject(String::new()));
    }

    #[test]
    fn test_parse_rejects_reserved_characters() {
        assert_eq!(
            parse_element("maxdepth=5"),
            Err(FilterSpecError::ReservedCharacter {
                element: "maxdepth=5".to_string(),
                character: '=',
            })
        );
        assert!(matches!(
            parse_element("java.base/java.lang.*"),
            Err(FilterSpecError::ReservedCharacter { character: '/', .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_wildcards() {
        for element in ["a*b", "a.***", "**", "*a", "a.*.*", "a**", "!a.b*.**"] {
            assert!(
                matches!(
                    parse_element(element),
                    Err(FilterSpecError::MisplacedWildcard { .. })
                ),
                "{element} should be rejected"
            );
        }
        assert!(matches!(
            parse_element(".**"),
            Err(FilterSpecError::EmptyHierarchy { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bare_marker() {
        assert_eq!(parse_element("!"), Err(FilterSpecError::EmptyRejectElement));
    }

    #[test]
    fn test_element_round_trips_through_rule() {
        for element in ["a.B", "!a.B", "a.*", "!a.**", "a.Pre*", "!*"] {
            assert_eq!(parse_element(element).unwrap().element(), element);
        }
    }

    #[test]
    fn test_compile_skips_blank_elements() {
        let spec = FilterSpec::compile(" !a.B ; ;!c.D; ").unwrap();
        assert_eq!(spec.rules().len(), 2);
        assert_eq!(spec.source_element(0), Some("!a.B"));
        assert_eq!(spec.mode(), Mode::Blocklist);
    }

    #[test]
    fn test_compile_groups_exact_rules() {
        let spec = FilterSpec::compile("!a.B;x.*;!c.D;e.F").unwrap();
        assert_eq!(
            spec.plan,
            vec![
                Step::ExactRejects,
                Step::Single(1),
                Step::ExactAccepts,
                Step::Single(4),
            ]
        );
        assert_eq!(spec.exact_rejects.get("c.D"), Some(&2));
    }

    #[test]
    fn test_allowlist_appends_client_support_rule() {
        let spec = FilterSpec::compile("com.example.*").unwrap();
        assert_eq!(spec.mode(), Mode::Allowlist);
        assert_eq!(
            spec.rules().last(),
            Some(&Rule::HierarchyAccept(CLIENT_SUPPORT_PACKAGE.to_string()))
        );
        assert_eq!(spec.source_element(1), None);
    }

    #[test]
    fn test_custom_client_package_is_normalized() {
        let options = CompileOptions {
            client_support_package: "org.acme.client".to_string(),
        };
        let spec = FilterSpec::compile_with("a.B", &options).unwrap();
        assert_eq!(
            spec.rules().last(),
            Some(&Rule::HierarchyAccept("org.acme.client.".to_string()))
        );

        let options = CompileOptions {
            client_support_package: String::new(),
        };
        let spec = FilterSpec::compile_with("a.B", &options).unwrap();
        assert_eq!(spec.rules().len(), 1);
        assert_eq!(spec.mode(), Mode::Allowlist);
    }
}
