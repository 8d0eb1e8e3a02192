use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

use crate::error::PlanError;
use crate::model::{Category, Group, Milestone, Plan, PlanItem, WorkPackage};

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

const PROJECT_KEYS: &[&str] = &["name", "meta"];
const CATEGORY_KEYS: &[&str] = &["id", "name", "color", "items", "meta"];
const ITEM_KEYS: &[&str] = &[
    "id",
    "name",
    "items",
    "duration_days",
    "start_date",
    "depends_on",
    "deadline_date",
    "meta",
];

/// Parse a plan document from YAML text.
///
/// The schema is closed: any unknown field at any node is a validation
/// error, reported with the node's path
/// (e.g. `categories[1].items[0].duration_days`). Item kinds are inferred
/// structurally — `items` makes a group, `deadline_date` a milestone,
/// `duration_days` a work package. A `meta` mapping is accepted anywhere
/// for tooling and ignored here.
pub fn parse_plan_str(input: &str) -> Result<Plan, PlanError> {
    let raw: Value = serde_yaml::from_str(input)
        .map_err(|err| PlanError::Validation(format!("invalid YAML: {err}")))?;
    parse_plan(&raw)
}

fn parse_plan(raw: &Value) -> Result<Plan, PlanError> {
    let root = as_mapping(raw, "root")?;
    assert_allowed_keys(root, &["project", "categories"], "root")?;

    let project = as_mapping(
        require(root, "project", "root")?,
        "project",
    )?;
    assert_allowed_keys(project, PROJECT_KEYS, "project")?;
    let name = require_str(project, "name", "project")?;
    check_meta(project, "project")?;

    let categories_raw = require(root, "categories", "root")?;
    let Value::Sequence(categories_raw) = categories_raw else {
        return Err(PlanError::Validation(
            "categories: expected list".to_string(),
        ));
    };

    let mut ids = HashSet::new();
    let mut categories = Vec::with_capacity(categories_raw.len());
    for (idx, category_raw) in categories_raw.iter().enumerate() {
        let path = format!("categories[{idx}]");
        categories.push(parse_category(category_raw, &path, &mut ids)?);
    }

    Ok(Plan { name, categories })
}

fn parse_category(raw: &Value, path: &str, ids: &mut HashSet<String>) -> Result<Category, PlanError> {
    let map = as_mapping(raw, path)?;
    assert_allowed_keys(map, CATEGORY_KEYS, path)?;
    let id = require_id(map, path, ids)?;
    let name = require_str(map, "name", path)?;
    let color = optional_str(map, "color", path)?;
    check_meta(map, path)?;

    let items_raw = require(map, "items", path)?;
    let Value::Sequence(items_raw) = items_raw else {
        return Err(PlanError::Validation(format!("{path}.items: expected list")));
    };
    let mut items = Vec::with_capacity(items_raw.len());
    for (idx, item_raw) in items_raw.iter().enumerate() {
        let child_path = format!("{path}.items[{idx}]");
        items.push(parse_item(item_raw, &child_path, ids)?);
    }

    Ok(Category {
        id,
        name,
        color,
        items,
    })
}

fn parse_item(raw: &Value, path: &str, ids: &mut HashSet<String>) -> Result<PlanItem, PlanError> {
    let map = as_mapping(raw, path)?;
    assert_allowed_keys(map, ITEM_KEYS, path)?;
    let id = require_id(map, path, ids)?;
    let name = require_str(map, "name", path)?;
    check_meta(map, path)?;

    let has_items = get(map, "items").is_some();
    let has_duration = get(map, "duration_days").is_some();
    let has_deadline = get(map, "deadline_date").is_some();

    if has_items {
        if has_duration || has_deadline || get(map, "depends_on").is_some() || get(map, "start_date").is_some() {
            return Err(PlanError::Validation(format!(
                "{path}: groups must not define scheduling fields"
            )));
        }
        let items_raw = require(map, "items", path)?;
        let Value::Sequence(items_raw) = items_raw else {
            return Err(PlanError::Validation(format!("{path}.items: expected list")));
        };
        let mut items = Vec::with_capacity(items_raw.len());
        for (idx, item_raw) in items_raw.iter().enumerate() {
            let child_path = format!("{path}.items[{idx}]");
            items.push(parse_item(item_raw, &child_path, ids)?);
        }
        return Ok(PlanItem::Group(Group { id, name, items }));
    }

    if has_duration && has_deadline {
        return Err(PlanError::Validation(format!(
            "{path}: choose either duration_days or deadline_date, not both"
        )));
    }

    if has_deadline {
        if get(map, "depends_on").is_some() || get(map, "start_date").is_some() {
            return Err(PlanError::Validation(format!(
                "{path}: milestones do not accept depends_on or start_date"
            )));
        }
        let deadline_date = parse_date(
            require(map, "deadline_date", path)?,
            &format!("{path}.deadline_date"),
        )?;
        return Ok(PlanItem::Milestone(Milestone {
            id,
            name,
            deadline_date,
        }));
    }

    if has_duration {
        let duration_days = match get(map, "duration_days") {
            Some(Value::Number(number)) if number.as_i64().is_some() => {
                number.as_i64().expect("checked above")
            }
            _ => {
                return Err(PlanError::Validation(format!(
                    "{path}.duration_days: expected integer"
                )));
            }
        };
        let start_date = match get(map, "start_date") {
            Some(value) => Some(parse_date(value, &format!("{path}.start_date"))?),
            None => None,
        };
        let depends_on = parse_depends_on(map, path)?;
        return Ok(PlanItem::Work(WorkPackage {
            id,
            name,
            duration_days,
            start_date,
            depends_on,
        }));
    }

    Err(PlanError::Validation(format!(
        "{path}: leaf items must define duration_days or deadline_date"
    )))
}

fn parse_depends_on(map: &Mapping, path: &str) -> Result<Vec<String>, PlanError> {
    match get(map, "depends_on") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(entries)) => {
            let mut depends_on = Vec::with_capacity(entries.len());
            for (idx, entry) in entries.iter().enumerate() {
                let Value::String(dep) = entry else {
                    return Err(PlanError::Validation(format!(
                        "{path}.depends_on[{idx}]: expected string id"
                    )));
                };
                depends_on.push(dep.clone());
            }
            Ok(depends_on)
        }
        Some(_) => Err(PlanError::Validation(format!(
            "{path}.depends_on: expected list of ids"
        ))),
    }
}

fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping, PlanError> {
    match value {
        Value::Mapping(map) => Ok(map),
        _ => Err(PlanError::Validation(format!("{path}: expected mapping"))),
    }
}

/// Key lookup that only matches string keys; non-string keys are caught
/// by the allowed-keys check.
fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter().find_map(|(k, v)| match k {
        Value::String(s) if s == key => Some(v),
        _ => None,
    })
}

fn assert_allowed_keys(map: &Mapping, allowed: &[&str], path: &str) -> Result<(), PlanError> {
    let mut extras: Vec<String> = Vec::new();
    for key in map.keys() {
        match key {
            Value::String(key) if allowed.contains(&key.as_str()) => {}
            Value::String(key) => extras.push(key.clone()),
            other => extras.push(format!("{other:?}")),
        }
    }
    if extras.is_empty() {
        return Ok(());
    }
    extras.sort();
    Err(PlanError::Validation(format!(
        "{path}: unexpected fields [{}]",
        extras.join(", ")
    )))
}

fn require<'a>(map: &'a Mapping, key: &str, path: &str) -> Result<&'a Value, PlanError> {
    get(map, key).ok_or_else(|| {
        PlanError::Validation(format!("{path}: missing required field '{key}'"))
    })
}

fn require_str(map: &Mapping, key: &str, path: &str) -> Result<String, PlanError> {
    match require(map, key, path)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(PlanError::Validation(format!(
            "{path}.{key}: expected non-empty string"
        ))),
    }
}

fn optional_str(map: &Mapping, key: &str, path: &str) -> Result<Option<String>, PlanError> {
    match get(map, key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(_) => Err(PlanError::Validation(format!(
            "{path}.{key}: expected non-empty string"
        ))),
    }
}

fn require_id(map: &Mapping, path: &str, ids: &mut HashSet<String>) -> Result<String, PlanError> {
    let id = require_str(map, "id", path)?;
    if !ID_RE.is_match(&id) {
        return Err(PlanError::Validation(format!(
            "{path}.id: '{id}' is not a valid identifier"
        )));
    }
    if !ids.insert(id.clone()) {
        return Err(PlanError::Validation(format!(
            "{path}.id: duplicate id '{id}'"
        )));
    }
    Ok(id)
}

fn parse_date(value: &Value, path: &str) -> Result<NaiveDate, PlanError> {
    let Value::String(text) = value else {
        return Err(PlanError::Validation(format!(
            "{path}: expected YYYY-MM-DD string"
        )));
    };
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| PlanError::Validation(format!("{path}: expected YYYY-MM-DD string")))
}

fn check_meta(map: &Mapping, path: &str) -> Result<(), PlanError> {
    match get(map, "meta") {
        None | Some(Value::Null) | Some(Value::Mapping(_)) => Ok(()),
        Some(_) => Err(PlanError::Validation(format!(
            "{path}.meta: expected mapping"
        ))),
    }
}
