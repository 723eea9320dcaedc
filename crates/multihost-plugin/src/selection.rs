//! Selection engine — decides which collected tests run.
//!
//! A test without topology marks always runs. A test with marks runs once
//! per mark the available topology satisfies (or equals, in exact mode) and
//! is deselected when none does. Without an inventory, every marked test is
//! deselected.

use crate::manifest::TestDecl;
use crate::marks::TopologyMark;
use crate::requirement::extract;
use multihost_core::{MultihostError, Topology};
use tracing::{debug, info};

/// A test as collected, with its declarations normalised into marks.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedTest {
    pub name: String,
    pub args: Vec<String>,
    pub marks: Vec<TopologyMark>,
}

impl CollectedTest {
    pub fn new(name: impl Into<String>, args: Vec<String>, marks: Vec<TopologyMark>) -> Self {
        Self {
            name: name.into(),
            args,
            marks,
        }
    }

    /// Normalise a manifest entry. Declaration errors surface here, at
    /// collection time.
    pub fn from_decl(decl: &TestDecl) -> Result<Self, MultihostError> {
        let marks = extract(&decl.name, &decl.requirements)?;
        Ok(Self::new(decl.name.clone(), decl.args.clone(), marks))
    }
}

/// Per-test selection state. Every test starts `Undetermined` and is
/// decided exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Undetermined,
    Kept,
    Deselected,
}

impl Selection {
    /// Leave `Undetermined`. A decided state is final.
    pub fn decide(self, keep: bool) -> Self {
        match self {
            Self::Undetermined if keep => Self::Kept,
            Self::Undetermined => Self::Deselected,
            decided => decided,
        }
    }
}

/// One run of a kept test, under at most one mark.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInvocation {
    /// `"<test> (<mark>)"` for marked runs, the bare test name otherwise.
    pub name: String,
    pub test: String,
    pub args: Vec<String>,
    pub mark: Option<TopologyMark>,
}

/// Outcome of selecting a whole batch.
#[derive(Debug, Clone, Default)]
pub struct SelectionReport {
    pub kept: Vec<TestInvocation>,
    /// Names of deselected tests, reported before anything runs.
    pub deselected: Vec<String>,
}

/// Compares each test's marks against the available topology.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine<'a> {
    available: Option<&'a Topology>,
    exact: bool,
}

impl<'a> SelectionEngine<'a> {
    /// `available` is `None` when the session has no configuration.
    pub fn new(available: Option<&'a Topology>, exact: bool) -> Self {
        Self { available, exact }
    }

    /// Whether the available topology can run `mark`.
    pub fn matches(&self, mark: &TopologyMark) -> bool {
        let Some(available) = self.available else {
            return false;
        };
        if self.exact {
            mark.topology == *available
        } else {
            mark.topology.satisfies(available)
        }
    }

    /// Decide one test; returns the state and the marks that matched.
    /// The state is never `Undetermined`.
    pub fn evaluate<'t>(&self, test: &'t CollectedTest) -> (Selection, Vec<&'t TopologyMark>) {
        let state = Selection::Undetermined;
        if test.marks.is_empty() {
            return (state.decide(true), Vec::new());
        }

        let matched: Vec<&TopologyMark> = test
            .marks
            .iter()
            .filter(|mark| {
                let ok = self.matches(mark);
                debug!(
                    "selection: {} ({}) {}",
                    test.name,
                    mark.name,
                    if ok { "satisfied" } else { "not satisfied" }
                );
                ok
            })
            .collect();

        (state.decide(!matched.is_empty()), matched)
    }

    /// Select the whole batch.
    pub fn select(&self, tests: &[CollectedTest]) -> SelectionReport {
        let mut report = SelectionReport::default();

        for test in tests {
            let (state, matched) = self.evaluate(test);
            if state != Selection::Kept {
                report.deselected.push(test.name.clone());
                continue;
            }

            if test.marks.is_empty() {
                report.kept.push(TestInvocation {
                    name: test.name.clone(),
                    test: test.name.clone(),
                    args: test.args.clone(),
                    mark: None,
                });
            }
            for mark in matched {
                report.kept.push(TestInvocation {
                    name: format!("{} ({})", test.name, mark.name),
                    test: test.name.clone(),
                    args: test.args.clone(),
                    mark: Some(mark.clone()),
                });
            }
        }

        info!(
            "selection: {} invocation(s) kept, {} test(s) deselected{}",
            report.kept.len(),
            report.deselected.len(),
            if self.exact { " (exact topology)" } else { "" }
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known::KnownTopology;
    use multihost_core::TopologyDomain;

    fn available(roles: &[(&str, i64)]) -> Topology {
        Topology::new(vec![TopologyDomain::new("sssd", roles.iter().copied()).unwrap()])
    }

    fn test_with(name: &str, marks: &[KnownTopology]) -> CollectedTest {
        CollectedTest::new(
            name,
            vec!["client".into(), "provider".into()],
            marks.iter().map(|k| k.mark().unwrap()).collect(),
        )
    }

    #[test]
    fn test_unmarked_test_is_kept() {
        let topo = available(&[("client", 1)]);
        let engine = SelectionEngine::new(Some(&topo), false);
        let t = CollectedTest::new("test_local", Vec::new(), Vec::new());
        assert_eq!(engine.evaluate(&t).0, Selection::Kept);

        let report = engine.select(&[t]);
        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].name, "test_local");
        assert!(report.kept[0].mark.is_none());
    }

    #[test]
    fn test_only_satisfied_alternative_is_kept() {
        let topo = available(&[("client", 1), ("ipa", 1)]);
        let engine = SelectionEngine::new(Some(&topo), false);
        let t = test_with("test_provider", &[KnownTopology::Ldap, KnownTopology::Ipa]);

        let (state, matched) = engine.evaluate(&t);
        assert_eq!(state, Selection::Kept);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "ipa");

        let report = engine.select(&[t]);
        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].name, "test_provider (ipa)");
        assert!(report.deselected.is_empty());
    }

    #[test]
    fn test_every_satisfied_alternative_runs() {
        let topo = available(&[("client", 1), ("ad", 1), ("samba", 1)]);
        let engine = SelectionEngine::new(Some(&topo), false);
        let report = engine.select(&[test_with(
            "test_any_ad",
            &[KnownTopology::Ad, KnownTopology::Samba],
        )]);
        let names: Vec<_> = report.kept.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["test_any_ad (ad)", "test_any_ad (samba)"]);
    }

    #[test]
    fn test_unsatisfied_test_is_deselected() {
        let topo = available(&[("client", 1)]);
        let engine = SelectionEngine::new(Some(&topo), false);
        let report = engine.select(&[test_with("test_ldap", &[KnownTopology::Ldap])]);
        assert!(report.kept.is_empty());
        assert_eq!(report.deselected, vec!["test_ldap"]);
    }

    #[test]
    fn test_exact_mode_rejects_subset() {
        let topo = Topology::new(vec![
            TopologyDomain::new("sssd", [("client", 1)]).unwrap(),
            TopologyDomain::new("ad", [("dc", 1)]).unwrap(),
        ]);
        let t = test_with("test_client", &[KnownTopology::Client]);

        let relaxed = SelectionEngine::new(Some(&topo), false);
        assert_eq!(relaxed.evaluate(&t).0, Selection::Kept);

        let exact = SelectionEngine::new(Some(&topo), true);
        assert_eq!(exact.evaluate(&t).0, Selection::Deselected);
    }

    #[test]
    fn test_exact_mode_accepts_equal() {
        let topo = available(&[("client", 1)]);
        let exact = SelectionEngine::new(Some(&topo), true);
        let t = test_with("test_client", &[KnownTopology::Client]);
        assert_eq!(exact.evaluate(&t).0, Selection::Kept);
    }

    #[test]
    fn test_no_inventory_deselects_marked_tests() {
        let engine = SelectionEngine::new(None, false);
        let report = engine.select(&[
            test_with("test_client", &[KnownTopology::Client]),
            CollectedTest::new("test_local", Vec::new(), Vec::new()),
        ]);
        assert_eq!(report.deselected, vec!["test_client"]);
        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].name, "test_local");
    }

    #[test]
    fn test_from_decl_surfaces_collection_errors() {
        let decl = TestDecl {
            name: "test_broken".into(),
            args: Vec::new(),
            requirements: vec![Default::default()],
        };
        assert!(matches!(
            CollectedTest::from_decl(&decl),
            Err(MultihostError::MissingRequirement { .. })
        ));
    }

    #[test]
    fn test_decide_leaves_undetermined_once() {
        assert_eq!(Selection::Undetermined.decide(true), Selection::Kept);
        assert_eq!(Selection::Undetermined.decide(false), Selection::Deselected);
        assert_eq!(Selection::Kept.decide(false), Selection::Kept);
        assert_eq!(Selection::Deselected.decide(true), Selection::Deselected);
    }

    #[test]
    fn test_evaluate_always_decides() {
        let topo = available(&[("client", 1)]);
        let engine = SelectionEngine::new(Some(&topo), false);
        let tests = [
            CollectedTest::new("test_local", Vec::new(), Vec::new()),
            test_with("test_client", &[KnownTopology::Client]),
            test_with("test_ipa", &[KnownTopology::Ipa]),
        ];
        let states: Vec<_> = tests.iter().map(|t| engine.evaluate(t).0).collect();
        assert_eq!(
            states,
            vec![Selection::Kept, Selection::Kept, Selection::Deselected]
        );
    }
}
