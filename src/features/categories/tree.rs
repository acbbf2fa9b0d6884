//! Pure tree rules for the category hierarchy. The service loads rows, these
//! functions decide; nothing here touches the database.

use std::collections::{HashMap, HashSet};

use crate::core::error::AppError;
use crate::features::categories::dtos::BreadcrumbItem;
use crate::features::categories::models::CategoryLink;

pub const PATH_SEPARATOR: char = '/';

/// `parent/slug`, or the bare slug at the root
pub fn compose_full_slug(parent_full_slug: Option<&str>, slug: &str) -> String {
    match parent_full_slug {
        Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, slug),
        None => slug.to_string(),
    }
}

/// Reject self-parenting and moves under the node's own subtree.
///
/// `parents` maps ancestor id to its parent id, loaded starting at `parent_id`.
/// The walk is capped at `max_hops` and stops early when an ancestor repeats,
/// so corrupt chains that do not pass through `node_id` are tolerated.
pub fn validate_ancestry(
    node_id: Option<i64>,
    parent_id: Option<i64>,
    parents: &HashMap<i64, Option<i64>>,
    max_hops: i64,
) -> Result<(), AppError> {
    let Some(node_id) = node_id else {
        return Ok(());
    };

    if parent_id == Some(node_id) {
        return Err(AppError::Validation(
            "Category cannot be its own parent.".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut current = parent_id;
    let mut hops = 0;

    while let Some(id) = current {
        if hops >= max_hops {
            break;
        }
        if id == node_id {
            return Err(AppError::Validation(
                "Cycle detected in category tree.".to_string(),
            ));
        }
        if !seen.insert(id) {
            break;
        }
        current = parents.get(&id).copied().flatten();
        hops += 1;
    }

    Ok(())
}

/// Swap `old_prefix` for `new_prefix` on a strict descendant path, keeping the remainder
pub fn rewrite_prefix(full_slug: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    let remainder = full_slug
        .strip_prefix(old_prefix)?
        .strip_prefix(PATH_SEPARATOR)?;
    Some(format!("{}{}{}", new_prefix, PATH_SEPARATOR, remainder))
}

/// Root-to-node breadcrumb.
///
/// Walks parent links from `start_id` for at most `max_depth` steps. When an id
/// repeats, that node is appended once more and the walk stops.
pub fn build_breadcrumb(
    start_id: i64,
    links: &HashMap<i64, CategoryLink>,
    max_depth: usize,
) -> Vec<BreadcrumbItem> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = links.get(&start_id);

    while let Some(link) = current {
        if chain.len() >= max_depth {
            break;
        }
        if !seen.insert(link.id) {
            chain.push(BreadcrumbItem::from(link));
            break;
        }
        chain.push(BreadcrumbItem::from(link));
        current = link.parent_id.and_then(|parent| links.get(&parent));
    }

    chain.reverse();
    chain
}

/// `(id, new_count)` for every row whose stored count differs from the live count
pub fn changed_counts(rows: &[(i64, i32, i64)]) -> Vec<(i64, i32)> {
    rows.iter()
        .filter_map(|&(id, stored, live)| {
            let live = i32::try_from(live).unwrap_or(i32::MAX);
            (stored != live).then_some((id, live))
        })
        .collect()
}
