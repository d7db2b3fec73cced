//! Dependency-first traversal of the foreign-key graph.
//!
//! [`Walker::walk`] visits every requested table and every table it
//! transitively references, calling [`TableAction::process`] once per table
//! after all of that table's dependencies have been processed. Dependencies
//! are discovered lazily through the [`SchemaInspector`] as tables are first
//! reached, and visited in lexicographic order so the processing order is
//! reproducible.
//!
//! Each table moves through `Unvisited -> Visiting -> Done`. Reaching a table
//! that is still `Visiting` means the foreign keys form a cycle; the walk
//! stops with [`BackupError::CyclicDependency`] naming the cycle.
//!
//! The traversal keeps an explicit stack of frames instead of recursing, so a
//! deep dependency chain cannot overflow the native stack. The order is the
//! same as the recursive depth-first post-order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::traits::{SchemaInspector, TableAction};
use crate::error::{BackupError, Result};

/// Per-walk state of a table. Absent from the map means unvisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Dependencies are being visited; `process` has not run yet.
    Visiting,
    /// `process` succeeded.
    Done,
}

/// What a completed walk did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    /// Tables in the order they were processed.
    pub order: Vec<String>,

    /// Direct dependencies of every visited table, lexicographically sorted.
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl WalkReport {
    /// Whether `table` was reached by the walk.
    pub fn contains(&self, table: &str) -> bool {
        self.dependencies.contains_key(table)
    }

    /// Tables that depend on `table` directly or transitively.
    pub fn dependents_of(&self, table: &str) -> BTreeSet<String> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for (referencing, deps) in &self.dependencies {
            for dep in deps {
                reverse.entry(dep.as_str()).or_default().push(referencing.as_str());
            }
        }

        let mut found = BTreeSet::new();
        let mut pending = vec![table];
        while let Some(current) = pending.pop() {
            for &dependent in reverse.get(current).into_iter().flatten() {
                if found.insert(dependent.to_string()) {
                    pending.push(dependent);
                }
            }
        }
        found
    }
}

/// One table on the traversal stack.
struct Frame {
    table: String,
    dependencies: Vec<String>,
    next: usize,
}

impl Frame {
    fn next_dependency(&mut self) -> Option<String> {
        let dep = self.dependencies.get(self.next).cloned();
        if dep.is_some() {
            self.next += 1;
        }
        dep
    }
}

/// Walks the dependency graph of a set of tables.
pub struct Walker<'a, I: SchemaInspector + ?Sized> {
    inspector: &'a I,
    states: HashMap<String, VisitState>,
    report: WalkReport,
}

impl<'a, I: SchemaInspector + ?Sized> Walker<'a, I> {
    /// Create a walker that discovers dependencies through `inspector`.
    pub fn new(inspector: &'a I) -> Self {
        Self {
            inspector,
            states: HashMap::new(),
            report: WalkReport::default(),
        }
    }

    /// Visit `requested` in input order, processing every reachable table
    /// exactly once, dependencies first.
    ///
    /// The visited set is scoped to this call. The first error from the
    /// inspector or the action aborts the walk.
    pub async fn walk<A>(&mut self, requested: &[String], action: &mut A) -> Result<WalkReport>
    where
        A: TableAction + ?Sized,
    {
        self.states.clear();
        self.report = WalkReport::default();

        for table in requested {
            self.visit(table, action).await?;
        }

        let report = std::mem::take(&mut self.report);
        info!(
            "Walked {} table(s) from {} requested: {}",
            report.order.len(),
            requested.len(),
            report.order.join(", ")
        );
        Ok(report)
    }

    /// Current state of `table` in this walk (`None` if unvisited).
    pub fn state(&self, table: &str) -> Option<VisitState> {
        self.states.get(table).copied()
    }

    async fn visit<A>(&mut self, table: &str, action: &mut A) -> Result<()>
    where
        A: TableAction + ?Sized,
    {
        if self.state(table) == Some(VisitState::Done) {
            debug!("{} already processed, skipping", table);
            return Ok(());
        }

        let mut stack = vec![self.enter(table).await?];

        while let Some(frame) = stack.last_mut() {
            match frame.next_dependency() {
                Some(dep) => match self.state(&dep) {
                    Some(VisitState::Done) => {}
                    Some(VisitState::Visiting) => return Err(cycle_error(&stack, &dep)),
                    None => {
                        let entered = self.enter(&dep).await?;
                        stack.push(entered);
                    }
                },
                None => {
                    if let Some(done) = stack.pop() {
                        self.finish(done.table, action).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Unvisited -> Visiting: look up the table's dependencies.
    async fn enter(&mut self, table: &str) -> Result<Frame> {
        self.states.insert(table.to_string(), VisitState::Visiting);

        let mut dependencies = Vec::new();
        for dep in self.inspector.list_dependencies(table).await? {
            if dep == table {
                debug!("{} references itself, ignoring for ordering", table);
                continue;
            }
            dependencies.push(dep);
        }
        debug!("{} depends on [{}]", table, dependencies.join(", "));

        self.report
            .dependencies
            .insert(table.to_string(), dependencies.clone());

        Ok(Frame {
            table: table.to_string(),
            dependencies,
            next: 0,
        })
    }

    /// Visiting -> Done: run the action, then record the table.
    async fn finish<A>(&mut self, table: String, action: &mut A) -> Result<()>
    where
        A: TableAction + ?Sized,
    {
        action.process(&table).await?;
        self.states.insert(table.clone(), VisitState::Done);
        self.report.order.push(table);
        Ok(())
    }
}

fn cycle_error(stack: &[Frame], reentered: &str) -> BackupError {
    let start = stack
        .iter()
        .position(|frame| frame.table == reentered)
        .unwrap_or(0);
    let mut path: Vec<String> = stack[start..].iter().map(|f| f.table.clone()).collect();
    path.push(reentered.to_string());
    BackupError::CyclicDependency { path }
}
