//! Failure discovery over reconstructed trace trees
//!
//! The walk is pre-order depth-first: a matching root is reported before any
//! of its descendants, and each child subtree is exhausted before the next
//! sibling is visited. Traversal uses an explicit stack bounded by
//! [`WalkLimits`], so corrupted or adversarial trees cannot exhaust the call
//! stack; hitting a bound stops the walk early and flags the outcome.

use tracing::warn;

use crate::config::AnalysisConfig;
use crate::models::{FailedRun, Run};

/// Bounds on a single walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Deepest level visited (the root is level 0)
    pub max_depth: usize,
    /// Maximum runs visited
    pub max_nodes: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        AnalysisConfig::default().walk_limits()
    }
}

/// Case-insensitive substring match on run names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatcher {
    patterns: Vec<String>,
}

impl NameMatcher {
    /// Match names containing any of `patterns`
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// The monitored operation only
    pub fn zenrows_scraper() -> Self {
        Self::new(["zenrows_scraper"])
    }

    /// Any zenrows or scraper operation, including aliased names like `BTC_scraper`
    pub fn scraper_detail() -> Self {
        Self::new(["zenrows", "scraper"])
    }

    /// Whether `name` contains one of the patterns
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.patterns.iter().any(|pattern| name.contains(pattern.as_str()))
    }
}

/// Result of walking one tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkOutcome {
    /// Failures in pre-order
    pub errors: Vec<FailedRun>,
    /// Runs visited
    pub visited: usize,
    /// Whether a limit stopped the walk before the whole tree was seen
    pub truncated: bool,
}

/// Finds failing runs of the monitored operation in a trace tree
#[derive(Debug, Clone)]
pub struct ErrorWalker {
    matcher: NameMatcher,
    limits: WalkLimits,
}

impl Default for ErrorWalker {
    fn default() -> Self {
        Self::new(NameMatcher::zenrows_scraper(), WalkLimits::default())
    }
}

impl ErrorWalker {
    /// Create a walker
    pub fn new(matcher: NameMatcher, limits: WalkLimits) -> Self {
        Self { matcher, limits }
    }

    /// Walker for the daily rate reports, configured from `config`
    pub fn basic(config: &AnalysisConfig) -> Self {
        Self::new(NameMatcher::new([&config.target_name]), config.walk_limits())
    }

    /// Walker for the detail reports, configured from `config`
    pub fn detail(config: &AnalysisConfig) -> Self {
        Self::new(NameMatcher::new(&config.detail_patterns), config.walk_limits())
    }

    /// Whether `run` is a failing run of the monitored operation
    pub fn is_failure(&self, run: &Run) -> bool {
        run.is_error() && self.matcher.matches(&run.name)
    }

    /// Find every failure in the tree rooted at `root`
    pub fn find_errors(&self, root: &Run) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let mut stack: Vec<(&Run, usize)> = vec![(root, 0)];

        while let Some((run, depth)) = stack.pop() {
            if outcome.visited >= self.limits.max_nodes {
                outcome.truncated = true;
                break;
            }
            outcome.visited += 1;

            if self.is_failure(run) {
                outcome.errors.push(FailedRun::from(run));
            }

            let children = run.children();
            if children.is_empty() {
                continue;
            }
            if depth >= self.limits.max_depth {
                outcome.truncated = true;
                continue;
            }
            stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
        }

        if outcome.truncated {
            warn!(
                root = %root.id,
                visited = outcome.visited,
                max_depth = self.limits.max_depth,
                max_nodes = self.limits.max_nodes,
                "Trace walk truncated, reporting partial results"
            );
        }

        outcome
    }
}
