//! Pathfinding algorithms
//!
//! Breadth-first hop distances and bounded enumeration of simple paths.

use super::common::GraphView;
use std::collections::VecDeque;

/// Hop distance from `source` to every node (`None` when unreachable)
pub fn bfs_distances(view: &GraphView, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; view.node_count];
    if source >= view.node_count {
        return dist;
    }

    let mut queue = VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        let next_dist = dist[current].map(|d| d + 1);
        for &next in view.neighbors(current) {
            if dist[next].is_none() {
                dist[next] = next_dist;
                queue.push_back(next);
            }
        }
    }

    dist
}

/// Result of a bounded simple-path enumeration
#[derive(Debug, Clone, Default)]
pub struct SimplePaths {
    /// Each path as a sequence of dense node indices, source first
    pub paths: Vec<Vec<usize>>,
    /// True when enumeration stopped at the `max_paths` bound
    pub truncated: bool,
}

/// Enumerate simple paths (no repeated node) from `source` to `target` with
/// at most `max_hops` edges, stopping after `max_paths` paths.
///
/// Branches that cannot reach the target within the remaining hop budget are
/// pruned using BFS distances from the target.
pub fn all_simple_paths(
    view: &GraphView,
    source: usize,
    target: usize,
    max_hops: usize,
    max_paths: usize,
) -> SimplePaths {
    let mut result = SimplePaths::default();
    if source >= view.node_count || target >= view.node_count || source == target {
        return result;
    }

    let to_target = bfs_distances(view, target);
    match to_target[source] {
        Some(d) if d <= max_hops => {}
        _ => return result,
    }

    let mut on_path = vec![false; view.node_count];
    let mut path = vec![source];
    on_path[source] = true;

    extend_paths(
        view,
        target,
        max_hops,
        max_paths,
        &to_target,
        &mut path,
        &mut on_path,
        &mut result,
    );

    result
}

#[allow(clippy::too_many_arguments)]
fn extend_paths(
    view: &GraphView,
    target: usize,
    max_hops: usize,
    max_paths: usize,
    to_target: &[Option<usize>],
    path: &mut Vec<usize>,
    on_path: &mut [bool],
    result: &mut SimplePaths,
) {
    let Some(&current) = path.last() else {
        return;
    };
    let hops_used = path.len() - 1;

    for &next in view.neighbors(current) {
        if result.paths.len() >= max_paths {
            result.truncated = true;
            return;
        }
        if on_path[next] {
            continue;
        }
        let remaining = max_hops - hops_used - 1;
        match to_target[next] {
            Some(d) if d <= remaining => {}
            _ => continue,
        }

        path.push(next);
        if next == target {
            result.paths.push(path.clone());
        } else {
            on_path[next] = true;
            extend_paths(view, target, max_hops, max_paths, to_target, path, on_path, result);
            on_path[next] = false;
        }
        path.pop();
    }
}
