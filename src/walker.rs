use std::collections::{HashSet, VecDeque};

use crate::cancel::CancelFlag;
use crate::index::DependencySource;
use crate::report::Reporter;
use crate::requirement::Requirement;

/// Raw requirement strings already visited, in visit order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessedSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl ProcessedSet {
    pub fn contains(&self, raw: &str) -> bool {
        self.seen.contains(raw)
    }

    fn insert(&mut self, raw: &str) -> bool {
        if !self.seen.insert(raw.to_string()) {
            return false;
        }
        self.order.push(raw.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Greedy breadth-first expansion of requirements, first seen wins.
pub struct DependencyWalker<'a> {
    source: &'a dyn DependencySource,
    reporter: &'a dyn Reporter,
    cancel: CancelFlag,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(source: &'a dyn DependencySource, reporter: &'a dyn Reporter) -> Self {
        Self {
            source,
            reporter,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn resolve_closure(&self, seeds: &[String]) -> ProcessedSet {
        let mut processed = ProcessedSet::default();
        let mut worklist: VecDeque<String> = seeds.iter().cloned().collect();

        while let Some(raw) = worklist.pop_front() {
            if self.cancel.is_cancelled() {
                self.reporter.warn("Dependency resolution interrupted");
                break;
            }
            if !processed.insert(&raw) {
                continue;
            }

            let requirement = Requirement::parse(&raw);
            let Some(version) = requirement.version.as_deref() else {
                self.reporter.debug(&format!(
                    "{raw} has no usable version ({:?} {:?}), not expanding",
                    requirement.operator, requirement.raw_version
                ));
                continue;
            };
            self.reporter.debug(&format!(
                "Expanding {} {version} ({:?})",
                requirement.name, requirement.operator
            ));

            match self.source.dependencies(&requirement.name, version) {
                Ok(dependencies) => {
                    for dependency in dependencies {
                        if !processed.contains(&dependency) {
                            worklist.push_back(dependency);
                        }
                    }
                }
                Err(error) => {
                    self.reporter
                        .error(&format!("Failed to process dependencies of {raw}: {error}"));
                }
            }
        }

        self.reporter
            .debug(&format!("Resolved {} requirement(s)", processed.len()));
        processed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::DependencyWalker;
    use crate::cancel::CancelFlag;
    use crate::config::IndexEndpoints;
    use crate::error::{AcquireError, AcquireResult};
    use crate::index::{DependencySource, IndexClient};
    use crate::testing::{FakeTransport, Level, RecordingReporter, release_json};

    #[derive(Default)]
    struct MapSource {
        deps: HashMap<(String, String), Vec<String>>,
        failing: Vec<String>,
        queried: RefCell<Vec<String>>,
    }

    impl MapSource {
        fn with(mut self, name: &str, version: &str, deps: &[&str]) -> Self {
            self.deps.insert(
                (name.to_string(), version.to_string()),
                deps.iter().map(|d| d.to_string()).collect(),
            );
            self
        }
    }

    impl DependencySource for MapSource {
        fn dependencies(&self, name: &str, version: &str) -> AcquireResult<Vec<String>> {
            self.queried.borrow_mut().push(format!("{name}=={version}"));
            if self.failing.iter().any(|n| n == name) {
                return Err(AcquireError::Network {
                    url: name.to_string(),
                    reason: "timed out".to_string(),
                });
            }
            Ok(self
                .deps
                .get(&(name.to_string(), version.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn seeds(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn terminates_on_cycle_and_visits_seed_once() {
        let source = MapSource::default()
            .with("alpha", "1.0.0", &["beta==2.0.0"])
            .with("beta", "2.0.0", &["alpha==1.0.0"]);
        let reporter = RecordingReporter::default();
        let walker = DependencyWalker::new(&source, &reporter);

        let closure = walker.resolve_closure(&seeds(&["alpha==1.0.0"]));
        let visited: Vec<&str> = closure.iter().collect();
        assert_eq!(visited, vec!["alpha==1.0.0", "beta==2.0.0"]);
        assert_eq!(
            visited.iter().filter(|raw| **raw == "alpha==1.0.0").count(),
            1
        );
        assert_eq!(source.queried.borrow().len(), 2);
    }

    #[test]
    fn self_dependency_does_not_loop() {
        let source = MapSource::default().with("ouro", "1.0", &["ouro==1.0"]);
        let reporter = RecordingReporter::default();
        let walker = DependencyWalker::new(&source, &reporter);

        let closure = walker.resolve_closure(&seeds(&["ouro==1.0", "ouro==1.0"]));
        assert_eq!(closure.into_vec(), vec!["ouro==1.0"]);
    }

    #[test]
    fn expands_breadth_first() {
        let source = MapSource::default()
            .with("a", "1", &["b==1", "c==1"])
            .with("b", "1", &["d==1"])
            .with("c", "1", &["e==1"]);
        let reporter = RecordingReporter::default();
        let walker = DependencyWalker::new(&source, &reporter);

        let closure = walker.resolve_closure(&seeds(&["a==1"]));
        assert_eq!(closure.into_vec(), vec!["a==1", "b==1", "c==1", "d==1", "e==1"]);
    }

    #[test]
    fn unversioned_requirement_is_recorded_but_not_expanded() {
        let source = MapSource::default().with("a", "1", &["numpy"]);
        let reporter = RecordingReporter::default();
        let walker = DependencyWalker::new(&source, &reporter);

        let closure = walker.resolve_closure(&seeds(&["a==1"]));
        assert!(closure.contains("numpy"));
        assert_eq!(source.queried.borrow().as_slice(), ["a==1"]);
    }

    #[test]
    fn failing_branch_does_not_abort_closure() {
        let mut source = MapSource::default()
            .with("ok", "1.0", &["leaf==1.0"])
            .with("bad", "1.0", &["never==1.0"]);
        source.failing.push("bad".to_string());
        let reporter = RecordingReporter::default();
        let walker = DependencyWalker::new(&source, &reporter);

        let closure = walker.resolve_closure(&seeds(&["bad==1.0", "ok==1.0"]));
        assert_eq!(closure.into_vec(), vec!["bad==1.0", "ok==1.0", "leaf==1.0"]);
        assert!(reporter.contains(Level::Error, "bad==1.0"));
    }

    #[test]
    fn cancelled_walk_stops_before_querying() {
        let source = MapSource::default().with("a", "1", &["b==1"]);
        let reporter = RecordingReporter::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let walker = DependencyWalker::new(&source, &reporter).with_cancel(cancel);

        let closure = walker.resolve_closure(&seeds(&["a==1", "c==2"]));
        assert!(closure.is_empty());
        assert!(source.queried.borrow().is_empty());
        assert!(reporter.contains(Level::Warn, "interrupted"));
    }

    #[test]
    fn resolves_alpha_then_beta_through_the_index() {
        let transport = FakeTransport::new()
            .with_text(
                "https://pypi.org/pypi/alpha/1.0.0/json",
                &release_json(&["beta>=2.0.0"]),
            )
            .with_text("https://pypi.org/pypi/beta/2.0.0/json", &release_json(&[]));
        let endpoints = IndexEndpoints::default();
        let reporter = RecordingReporter::default();
        let index = IndexClient::new(&transport, &endpoints, &reporter);
        let walker = DependencyWalker::new(&index, &reporter);

        let closure = walker.resolve_closure(&seeds(&["alpha==1.0.0"]));
        assert_eq!(closure.len(), 2);
        assert_eq!(closure.into_vec(), vec!["alpha==1.0.0", "beta>=2.0.0"]);
        assert_eq!(
            transport.requests.borrow().as_slice(),
            [
                "GET https://pypi.org/pypi/alpha/1.0.0/json",
                "GET https://pypi.org/pypi/beta/2.0.0/json",
            ]
        );
    }
}
