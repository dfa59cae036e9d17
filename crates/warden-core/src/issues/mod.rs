//! Issue detector: advisory structural checks over workflow definitions.
//!
//! Findings are attached to a [`WorkflowAnalysis`](warden_types::analysis::WorkflowAnalysis)
//! but never influence the disable decision. The detector is a loop over an
//! ordered list of injectable rules:
//!
//! - [`DetectionRule`] -- `(repository, path, content) -> [issue]`, one
//!   definition at a time.
//! - [`RepositoryRule`] -- sees every definition of a repository at once, for
//!   checks such as "more than one push-triggered deploy workflow".
//!
//! Organization-specific heuristics are added with [`IssueDetector::with_rule`]
//! instead of branching inside the detector.

pub mod rules;

use std::collections::BTreeMap;

use serde_yaml_ng::Value;

/// A parsed workflow definition handed to each rule.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionContext<'a> {
    pub repository: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub document: &'a Value,
}

/// A per-definition check.
pub trait DetectionRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &DefinitionContext<'_>) -> Vec<String>;
}

/// A check over all definitions of one repository. Returns
/// `(path, issue)` pairs.
pub trait RepositoryRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, repository: &str, definitions: &[DefinitionContext<'_>]) -> Vec<(String, String)>;
}

/// A [`DetectionRule`] backed by a plain function.
pub struct FnRule(pub &'static str, pub fn(&DefinitionContext<'_>) -> Vec<String>);

impl DetectionRule for FnRule {
    fn name(&self) -> &'static str {
        self.0
    }

    fn check(&self, ctx: &DefinitionContext<'_>) -> Vec<String> {
        (self.1)(ctx)
    }
}

/// A [`RepositoryRule`] backed by a plain function.
pub struct FnRepositoryRule(
    pub &'static str,
    pub fn(&str, &[DefinitionContext<'_>]) -> Vec<(String, String)>,
);

impl RepositoryRule for FnRepositoryRule {
    fn name(&self) -> &'static str {
        self.0
    }

    fn check(&self, repository: &str, definitions: &[DefinitionContext<'_>]) -> Vec<(String, String)> {
        (self.1)(repository, definitions)
    }
}

/// Ordered collection of detection rules.
#[derive(Default)]
pub struct IssueDetector {
    rules: Vec<Box<dyn DetectionRule>>,
    repository_rules: Vec<Box<dyn RepositoryRule>>,
}

impl IssueDetector {
    /// A detector with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// A detector with the built-in rule set from [`rules`].
    pub fn with_default_rules() -> Self {
        let mut detector = Self::new();
        for rule in rules::default_rules() {
            detector.rules.push(rule);
        }
        for rule in rules::default_repository_rules() {
            detector.repository_rules.push(rule);
        }
        detector
    }

    pub fn with_rule(mut self, rule: impl DetectionRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn with_repository_rule(mut self, rule: impl RepositoryRule + 'static) -> Self {
        self.repository_rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .map(|r| r.name())
            .chain(self.repository_rules.iter().map(|r| r.name()))
            .collect()
    }

    /// Run every per-definition rule over `content`.
    ///
    /// A definition that fails to parse yields no issues and a warning.
    pub fn detect(&self, repository: &str, path: &str, content: &str) -> Vec<String> {
        let Some(document) = parse_definition(repository, path, content) else {
            return Vec::new();
        };
        let ctx = DefinitionContext {
            repository,
            path,
            content,
            document: &document,
        };
        self.rules.iter().flat_map(|rule| rule.check(&ctx)).collect()
    }

    /// Run every repository-level rule over the definitions of one
    /// repository. `definitions` holds `(path, content)` pairs; unparseable
    /// entries are skipped. The result maps paths to issues.
    pub fn detect_repository(
        &self,
        repository: &str,
        definitions: &[(String, String)],
    ) -> BTreeMap<String, Vec<String>> {
        let mut found: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if self.repository_rules.is_empty() {
            return found;
        }

        let parsed: Vec<(&str, &str, Value)> = definitions
            .iter()
            .filter_map(|(path, content)| {
                parse_definition(repository, path, content).map(|doc| (path.as_str(), content.as_str(), doc))
            })
            .collect();
        let contexts: Vec<DefinitionContext<'_>> = parsed
            .iter()
            .map(|(path, content, document)| DefinitionContext {
                repository,
                path,
                content,
                document,
            })
            .collect();

        for rule in &self.repository_rules {
            for (path, issue) in rule.check(repository, &contexts) {
                found.entry(path).or_default().push(issue);
            }
        }
        found
    }
}

fn parse_definition(repository: &str, path: &str, content: &str) -> Option<Value> {
    match serde_yaml_ng::from_str::<Value>(content) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(
                repository,
                path,
                error = %e,
                "failed to parse workflow definition; skipping issue detection"
            );
            None
        }
    }
}
