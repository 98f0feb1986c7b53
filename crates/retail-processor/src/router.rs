//! Department router
//!
//! Splits the masked purchase stream into named branches using an
//! ordered routing table of (predicate, branch label) pairs. Predicates
//! are evaluated in declaration order and the first match wins, so each
//! event lands in at most one branch by construction. Events matching no
//! branch are dropped from this router's output only; every other stage
//! still sees them.

use retail_events::Purchase;

/// Predicate deciding whether a purchase belongs to a branch
pub type BranchPredicate = Box<dyn Fn(&Purchase) -> bool + Send + Sync>;

/// A named branch and its membership predicate
pub struct Branch {
    label: String,
    predicate: BranchPredicate,
}

impl Branch {
    /// Create a branch from a label and predicate
    pub fn new<S, F>(label: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Purchase) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Branch label, used as the output channel name
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch").field("label", &self.label).finish()
    }
}

/// Ordered first-match-wins router
#[derive(Debug)]
pub struct DepartmentRouter {
    branches: Vec<Branch>,
}

impl DepartmentRouter {
    /// Build a router from branches in priority order
    pub fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    /// The default coffee-before-electronics routing table
    pub fn coffee_and_electronics() -> Self {
        Self::new(vec![
            Branch::new("coffee", |p: &Purchase| p.department == "coffee"),
            Branch::new("electronics", |p: &Purchase| {
                p.department == "electronics"
            }),
        ])
    }

    /// Route a purchase to its branch label, if any
    ///
    /// Does not mutate or consume the event.
    pub fn route(&self, purchase: &Purchase) -> Option<&str> {
        self.branches
            .iter()
            .find(|branch| (branch.predicate)(purchase))
            .map(|branch| branch.label())
    }

    /// Branch labels in priority order
    pub fn labels(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.label()).collect()
    }
}
