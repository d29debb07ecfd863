//! Dependency graph construction and install ordering.
//!
//! Replaces naive recursive dependency walking with an explicit graph:
//! cycles are detected and rejected up front, and the resulting linear
//! order is deterministic — a DFS post-order that preserves each recipe's
//! declared dependency order, so every dependency appears strictly before
//! its dependents.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::core::recipe::{Recipe, Registry};

/// Error while resolving the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown package: `{name}`{}", required_by_note(.required_by))]
    UnknownPackage {
        name: String,
        required_by: Option<String>,
    },

    #[error("cyclic dependency: {}", members.join(" -> "))]
    CyclicDependency { members: Vec<String> },
}

fn required_by_note(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (required by `{parent}`)"),
        None => String::new(),
    }
}

/// Compute the leaf-first install order for the given root packages.
///
/// The order contains every transitive dependency exactly once. Roots are
/// processed in the given order; within a recipe, dependencies keep their
/// declared order.
pub fn install_order<'r>(
    registry: &'r dyn Registry,
    roots: &[&str],
) -> Result<Vec<&'r Recipe>, GraphError> {
    let closure = reachable_closure(registry, roots)?;
    detect_cycles(&closure)?;

    // Cycle-free by now, so a plain DFS post-order cannot recurse forever.
    let mut order: Vec<&Recipe> = Vec::new();
    let mut visited: HashMap<&str, ()> = HashMap::new();
    for root in roots {
        let recipe = closure[root];
        visit(&closure, recipe, &mut visited, &mut order);
    }
    Ok(order)
}

fn visit<'r>(
    closure: &HashMap<&'r str, &'r Recipe>,
    recipe: &'r Recipe,
    visited: &mut HashMap<&'r str, ()>,
    order: &mut Vec<&'r Recipe>,
) {
    if visited.contains_key(recipe.name.as_str()) {
        return;
    }
    visited.insert(&recipe.name, ());
    for dep in &recipe.dependencies {
        visit(closure, closure[dep.as_str()], visited, order);
    }
    order.push(recipe);
}

/// Collect every recipe reachable from the roots, failing on unknown names.
fn reachable_closure<'r>(
    registry: &'r dyn Registry,
    roots: &[&str],
) -> Result<HashMap<&'r str, &'r Recipe>, GraphError> {
    let mut closure: HashMap<&str, &Recipe> = HashMap::new();
    let mut queue: Vec<(String, Option<String>)> =
        roots.iter().map(|r| (r.to_string(), None)).collect();

    while let Some((name, required_by)) = queue.pop() {
        if closure.contains_key(name.as_str()) {
            continue;
        }
        let recipe = registry
            .lookup(&name)
            .ok_or(GraphError::UnknownPackage { name: name.clone(), required_by })?;
        closure.insert(&recipe.name, recipe);
        for dep in &recipe.dependencies {
            queue.push((dep.clone(), Some(recipe.name.clone())));
        }
    }

    Ok(closure)
}

/// Reject any dependency cycle among the given recipes.
pub fn detect_cycles(closure: &HashMap<&str, &Recipe>) -> Result<(), GraphError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for &name in closure.keys() {
        nodes.insert(name, graph.add_node(name));
    }
    for recipe in closure.values() {
        for dep in &recipe.dependencies {
            // Edge dep -> dependent: a topological order is build order.
            graph.add_edge(nodes[dep.as_str()], nodes[recipe.name.as_str()], ());
        }
    }

    for scc in tarjan_scc(&graph) {
        let is_cycle = scc.len() > 1
            || (scc.len() == 1 && graph.contains_edge(scc[0], scc[0]));
        if is_cycle {
            let mut members: Vec<String> =
                scc.iter().map(|&ix| graph[ix].to_string()).collect();
            members.sort();
            // Close the loop for readability.
            members.push(members[0].clone());
            return Err(GraphError::CyclicDependency { members });
        }
    }

    Ok(())
}
