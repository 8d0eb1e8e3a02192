use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::error::PlanError;
use crate::model::{Plan, PlanItem};

/// Per-work-package slice of the tree used by the date solver. Extracted
/// up front so date resolution can read predecessor finishes without
/// aliasing mutable borrows into the tree.
#[derive(Debug, Clone)]
struct WpRecord {
    id: String,
    duration_days: i64,
    explicit_start: Option<NaiveDate>,
    depends_on: Vec<String>,
}

/// Validate and schedule a plan in place.
///
/// Hard gates, in order: identifier uniqueness, dependency reference
/// resolution, cycle detection, topological ordering, date resolution.
/// Each gate fails fast; nothing is written back to the tree until every
/// gate has passed. Missing work-package start dates are inferred from
/// predecessor finishes using the zero-gap convention: a dependent starts
/// on the same calendar day its latest predecessor's inclusive finish
/// falls.
pub fn schedule(plan: &mut Plan) -> Result<(), PlanError> {
    let kinds = validate_unique_ids(plan)?;
    validate_dependencies(plan, &kinds)?;

    let records = collect_records(plan);
    debug!(work_packages = records.len(), "scheduling pass");

    find_cycle(&records)?;
    let order = toposort(&records)?;
    let starts = resolve_dates(&records, &order)?;

    for wp in plan.work_packages_mut() {
        if wp.start_date.is_none() {
            wp.start_date = starts.get(wp.id.as_str()).copied().flatten();
        }
    }
    Ok(())
}

/// Spans for every group, keyed by group id. Derived from children after
/// scheduling; either bound may be `None` when no child resolved.
pub fn group_spans(plan: &Plan) -> BTreeMap<String, (Option<NaiveDate>, Option<NaiveDate>)> {
    fn visit(
        items: &[PlanItem],
        spans: &mut BTreeMap<String, (Option<NaiveDate>, Option<NaiveDate>)>,
    ) {
        for item in items {
            if let PlanItem::Group(group) = item {
                visit(&group.items, spans);
                spans.insert(group.id.clone(), (item.span_start(), item.span_finish()));
            }
        }
    }

    let mut spans = BTreeMap::new();
    for category in &plan.categories {
        visit(&category.items, &mut spans);
    }
    spans
}

fn validate_unique_ids(plan: &Plan) -> Result<HashMap<String, &'static str>, PlanError> {
    fn register(
        id: &str,
        kind: &'static str,
        seen: &mut HashMap<String, &'static str>,
    ) -> Result<(), PlanError> {
        if let Some(existing) = seen.insert(id.to_string(), kind) {
            return Err(PlanError::Validation(format!(
                "duplicate id '{id}' (first seen as {existing}, again as {kind})"
            )));
        }
        Ok(())
    }

    fn visit(items: &[PlanItem], seen: &mut HashMap<String, &'static str>) -> Result<(), PlanError> {
        for item in items {
            register(item.id(), item.kind(), seen)?;
            if let PlanItem::Group(group) = item {
                visit(&group.items, seen)?;
            }
        }
        Ok(())
    }

    let mut seen = HashMap::new();
    for category in &plan.categories {
        register(&category.id, "category", &mut seen)?;
        visit(&category.items, &mut seen)?;
    }
    Ok(seen)
}

fn validate_dependencies(plan: &Plan, kinds: &HashMap<String, &'static str>) -> Result<(), PlanError> {
    for wp in plan.work_packages() {
        for dep_id in &wp.depends_on {
            match kinds.get(dep_id.as_str()).copied() {
                None => {
                    return Err(PlanError::Validation(format!(
                        "work package '{}' depends on unknown id '{dep_id}'",
                        wp.id
                    )));
                }
                Some("work package") => {}
                Some(kind) => {
                    return Err(PlanError::Validation(format!(
                        "work package '{}' depends on '{dep_id}', which is a {kind}, not a work package",
                        wp.id
                    )));
                }
            }
        }
    }
    Ok(())
}

fn collect_records(plan: &Plan) -> Vec<WpRecord> {
    plan.work_packages()
        .into_iter()
        .map(|wp| WpRecord {
            id: wp.id.clone(),
            duration_days: wp.duration_days,
            explicit_start: wp.start_date,
            depends_on: wp.depends_on.clone(),
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color depth-first cycle check over the work-package dependency
/// graph. Runs on an explicit stack so arbitrarily deep plans cannot
/// overflow the call stack. On a back-edge the reported path runs from
/// the repeated node's first entry on the active chain through to the
/// repetition.
fn find_cycle(records: &[WpRecord]) -> Result<(), PlanError> {
    let deps: HashMap<&str, &[String]> = records
        .iter()
        .map(|record| (record.id.as_str(), record.depends_on.as_slice()))
        .collect();
    let mut color: HashMap<&str, Color> =
        records.iter().map(|record| (record.id.as_str(), Color::White)).collect();

    for root in records {
        if color[root.id.as_str()] != Color::White {
            continue;
        }

        // Frame = (node, index of the next dependency to expand).
        let mut stack: Vec<(&str, usize)> = vec![(root.id.as_str(), 0)];
        let mut path: Vec<&str> = vec![root.id.as_str()];
        let mut position: HashMap<&str, usize> = HashMap::new();
        position.insert(root.id.as_str(), 0);
        color.insert(root.id.as_str(), Color::Gray);

        loop {
            let Some(&mut (node, ref mut next)) = stack.last_mut() else {
                break;
            };
            let node_deps = deps.get(node).copied().unwrap_or(&[]);
            if *next >= node_deps.len() {
                color.insert(node, Color::Black);
                position.remove(node);
                path.pop();
                stack.pop();
                continue;
            }
            let dep = node_deps[*next].as_str();
            *next += 1;
            match color.get(dep).copied() {
                Some(Color::Gray) => {
                    let from = position[dep];
                    let mut cycle: Vec<&str> = path[from..].to_vec();
                    cycle.push(dep);
                    return Err(PlanError::Validation(format!(
                        "dependency cycle detected: {}",
                        cycle.join(" -> ")
                    )));
                }
                Some(Color::White) => {
                    color.insert(dep, Color::Gray);
                    position.insert(dep, path.len());
                    path.push(dep);
                    stack.push((dep, 0));
                }
                // Black nodes are finished subtrees; references outside the
                // work-package graph were rejected by the reference check.
                _ => {}
            }
        }
    }
    Ok(())
}

/// Kahn's algorithm seeded and drained in document order, so independent
/// work packages keep their input order and the result never depends on
/// hash iteration.
fn toposort(records: &[WpRecord]) -> Result<Vec<String>, PlanError> {
    let mut indegree: HashMap<&str, usize> =
        records.iter().map(|record| (record.id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> =
        records.iter().map(|record| (record.id.as_str(), Vec::new())).collect();

    for record in records {
        for dep in &record.depends_on {
            if let Some(children) = dependents.get_mut(dep.as_str()) {
                children.push(record.id.as_str());
                *indegree.get_mut(record.id.as_str()).expect("registered above") += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = records
        .iter()
        .map(|record| record.id.as_str())
        .filter(|id| indegree[id] == 0)
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(records.len());

    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());
        for &child in &dependents[current] {
            let degree = indegree.get_mut(child).expect("registered above");
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() != records.len() {
        // Unreachable once find_cycle has passed.
        return Err(PlanError::Internal(
            "topological order incomplete after cycle check".to_string(),
        ));
    }
    Ok(order)
}

/// Resolve start dates in topological order. Returns the full start map;
/// entries stay `None` for work packages that have no dependencies and no
/// explicit date (legal as long as nothing downstream needs them).
fn resolve_dates(
    records: &[WpRecord],
    order: &[String],
) -> Result<HashMap<String, Option<NaiveDate>>, PlanError> {
    let by_id: HashMap<&str, &WpRecord> =
        records.iter().map(|record| (record.id.as_str(), record)).collect();
    let mut starts: HashMap<String, Option<NaiveDate>> = HashMap::new();
    let mut finishes: HashMap<&str, Option<NaiveDate>> = HashMap::new();

    for id in order {
        let record = by_id[id.as_str()];
        if record.duration_days <= 0 {
            return Err(PlanError::Scheduling(format!(
                "work package '{}' has non-positive duration_days={}",
                record.id, record.duration_days
            )));
        }

        let start = if record.depends_on.is_empty() {
            record.explicit_start
        } else {
            // Stable max: equal finishes keep the first-listed dependency.
            let mut latest: Option<(&str, NaiveDate)> = None;
            for dep_id in &record.depends_on {
                let finish = finishes.get(dep_id.as_str()).copied().flatten();
                let Some(finish) = finish else {
                    return Err(PlanError::Scheduling(format!(
                        "cannot schedule '{}' because predecessor '{dep_id}' has no start date",
                        record.id
                    )));
                };
                if latest.is_none_or(|(_, best)| finish > best) {
                    latest = Some((dep_id.as_str(), finish));
                }
            }
            let (latest_id, latest_finish) = latest.expect("depends_on is non-empty");

            match record.explicit_start {
                None => Some(latest_finish),
                Some(start) if start < latest_finish => {
                    return Err(PlanError::Scheduling(format!(
                        "work package '{}' start {start} precedes dependency '{latest_id}' finish {latest_finish}",
                        record.id
                    )));
                }
                Some(start) => Some(start),
            }
        };

        let finish = start.map(|s| s + Duration::days(record.duration_days - 1));
        starts.insert(record.id.clone(), start);
        finishes.insert(record.id.as_str(), finish);
    }
    Ok(starts)
}
