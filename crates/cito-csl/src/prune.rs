//! Schema-driven pruning of invalid CSL fields
//!
//! Upstream metadata is frequently not schema-conformant. Rather than
//! rejecting such records, the pruner validates against the CSL item
//! schema and deletes exactly the offending values, re-validating until
//! the record converges or a fixed pass bound is hit.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::item::CslItem;
use crate::schema::{Schema, CSL_ITEM_SCHEMA};

/// Repair passes before giving up on a record that will not converge.
const MAX_PASSES: usize = 5;

/// One step into a nested JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// Array indices sort below object keys so sibling deletions happen
/// deepest-and-rightmost first, keeping earlier indices valid.
impl Ord for PathStep {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (PathStep::Index(a), PathStep::Index(b)) => a.cmp(b),
            (PathStep::Key(a), PathStep::Key(b)) => a.cmp(b),
            (PathStep::Index(_), PathStep::Key(_)) => std::cmp::Ordering::Less,
            (PathStep::Key(_), PathStep::Index(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl PartialOrd for PathStep {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => write!(f, ".{key}"),
            PathStep::Index(index) => write!(f, "[{index}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViolationKind {
    /// Value category does not match the schema's `type` constraint.
    Type,
    /// Value is outside a closed vocabulary.
    Enum,
    MinItems,
    MaxItems,
    /// Object carries keys the schema does not declare.
    AdditionalProperties { extras: Vec<String> },
    /// Declared-required fields are missing. Not repairable by deletion.
    Required { missing: Vec<String> },
    /// No `anyOf` branch validated. Each entry holds one branch's
    /// violations with paths relative to this node.
    AnyOf { branches: Vec<Vec<Violation>> },
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub path: Vec<PathStep>,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for step in &self.path {
            write!(f, "{step}")?;
        }
        match &self.kind {
            ViolationKind::Type => write!(f, ": wrong value type"),
            ViolationKind::Enum => write!(f, ": value outside allowed vocabulary"),
            ViolationKind::MinItems => write!(f, ": array below minimum length"),
            ViolationKind::MaxItems => write!(f, ": array above maximum length"),
            ViolationKind::AdditionalProperties { extras } => {
                write!(f, ": undeclared fields {extras:?}")
            }
            ViolationKind::Required { missing } => {
                write!(f, ": missing required fields {missing:?}")
            }
            ViolationKind::AnyOf { branches } => {
                write!(f, ": no matching alternative ({} branches failed)", branches.len())
            }
        }
    }
}

/// Validate an item against the CSL item schema.
pub fn validate(item: &CslItem) -> Vec<Violation> {
    let value = Value::Object(item.fields.clone());
    let mut violations = Vec::new();
    collect(&value, &CSL_ITEM_SCHEMA, Vec::new(), &mut violations);
    violations
}

/// Delete schema-violating values from the item in place.
///
/// Runs up to [`MAX_PASSES`] validate-and-delete rounds. A record that
/// still fails afterwards is left best-effort and logged; the caller's
/// post-condition check decides whether that is fatal.
pub fn remove_schema_errors(item: &mut CslItem) {
    let mut value = Value::Object(std::mem::take(&mut item.fields));
    for _ in 0..MAX_PASSES {
        let mut violations = Vec::new();
        collect(&value, &CSL_ITEM_SCHEMA, Vec::new(), &mut violations);
        if violations.is_empty() {
            break;
        }
        // Only missing-field violations left: deletion cannot help.
        if violations
            .iter()
            .all(|violation| matches!(violation.kind, ViolationKind::Required { .. }))
        {
            for violation in &violations {
                warn!(%violation, "cannot repair by deletion");
            }
            break;
        }
        violations.sort_by(|a, b| b.path.cmp(&a.path));
        for violation in &violations {
            apply(&mut value, violation);
        }
    }
    match value {
        Value::Object(fields) => item.fields = fields,
        _ => unreachable!("pruning never replaces the root object"),
    }
}

fn collect(value: &Value, schema: &Schema, path: Vec<PathStep>, out: &mut Vec<Violation>) {
    match schema {
        Schema::Primitive(types) => {
            if !types.iter().any(|json_type| json_type.matches(value)) {
                out.push(Violation {
                    path,
                    kind: ViolationKind::Type,
                });
            }
        }
        Schema::Enum(allowed) => match value {
            Value::String(text) if allowed.contains(&text.as_str()) => {}
            _ => out.push(Violation {
                path,
                kind: ViolationKind::Enum,
            }),
        },
        Schema::Object {
            properties,
            required,
            additional_properties,
        } => {
            let Value::Object(map) = value else {
                out.push(Violation {
                    path,
                    kind: ViolationKind::Type,
                });
                return;
            };
            if !additional_properties {
                let extras: Vec<String> = map
                    .keys()
                    .filter(|key| !properties.contains_key(key.as_str()))
                    .cloned()
                    .collect();
                if !extras.is_empty() {
                    out.push(Violation {
                        path: path.clone(),
                        kind: ViolationKind::AdditionalProperties { extras },
                    });
                }
            }
            let missing: Vec<String> = required
                .iter()
                .filter(|field| !map.contains_key(**field))
                .map(|field| field.to_string())
                .collect();
            if !missing.is_empty() {
                out.push(Violation {
                    path: path.clone(),
                    kind: ViolationKind::Required { missing },
                });
            }
            for (key, sub_value) in map {
                if let Some(sub_schema) = properties.get(key.as_str()) {
                    let mut sub_path = path.clone();
                    sub_path.push(PathStep::Key(key.clone()));
                    collect(sub_value, sub_schema, sub_path, out);
                }
            }
        }
        Schema::Array {
            items,
            min_items,
            max_items,
        } => {
            let Value::Array(elements) = value else {
                out.push(Violation {
                    path,
                    kind: ViolationKind::Type,
                });
                return;
            };
            if min_items.map(|min| elements.len() < min).unwrap_or(false) {
                out.push(Violation {
                    path: path.clone(),
                    kind: ViolationKind::MinItems,
                });
                return;
            }
            if max_items.map(|max| elements.len() > max).unwrap_or(false) {
                out.push(Violation {
                    path: path.clone(),
                    kind: ViolationKind::MaxItems,
                });
                return;
            }
            for (index, element) in elements.iter().enumerate() {
                let mut sub_path = path.clone();
                sub_path.push(PathStep::Index(index));
                collect(element, items, sub_path, out);
            }
        }
        Schema::AnyOf(alternatives) => {
            let mut branches = Vec::with_capacity(alternatives.len());
            for alternative in alternatives {
                let mut branch_violations = Vec::new();
                collect(value, alternative, Vec::new(), &mut branch_violations);
                if branch_violations.is_empty() {
                    return;
                }
                branches.push(branch_violations);
            }
            out.push(Violation {
                path,
                kind: ViolationKind::AnyOf { branches },
            });
        }
    }
}

fn apply(root: &mut Value, violation: &Violation) {
    match &violation.kind {
        ViolationKind::Type
        | ViolationKind::Enum
        | ViolationKind::MinItems
        | ViolationKind::MaxItems => delete_at(root, &violation.path),
        ViolationKind::AdditionalProperties { extras } => {
            if let Some(Value::Object(map)) = get_mut(root, &violation.path) {
                for key in extras {
                    map.shift_remove(key);
                }
            }
        }
        ViolationKind::Required { missing } => {
            warn!(?missing, "missing required fields cannot be repaired by deletion");
        }
        ViolationKind::AnyOf { branches } => {
            let mut sub_violations: Vec<&Violation> = branches.iter().flatten().collect();
            sub_violations.sort_by(|a, b| b.path.cmp(&a.path));
            // Branches often re-report the same undeclared keys; deleting
            // them once is enough and repeats must not delete past that.
            let mut handled_additional = false;
            for sub_violation in sub_violations {
                if matches!(sub_violation.kind, ViolationKind::AdditionalProperties { .. }) {
                    if handled_additional {
                        continue;
                    }
                    handled_additional = true;
                }
                let mut absolute_path = violation.path.clone();
                absolute_path.extend(sub_violation.path.iter().cloned());
                apply(
                    root,
                    &Violation {
                        path: absolute_path,
                        kind: sub_violation.kind.clone(),
                    },
                );
            }
        }
    }
}

fn get_mut<'a>(root: &'a mut Value, path: &[PathStep]) -> Option<&'a mut Value> {
    let mut current = root;
    for step in path {
        current = match step {
            PathStep::Key(key) => current.as_object_mut()?.get_mut(key)?,
            PathStep::Index(index) => current.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

/// Delete the value at `path`. Already-removed targets are skipped.
fn delete_at(root: &mut Value, path: &[PathStep]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let Some(parent) = get_mut(root, parents) else {
        return;
    };
    match (parent, last) {
        (Value::Object(map), PathStep::Key(key)) => {
            map.shift_remove(key);
        }
        (Value::Array(elements), PathStep::Index(index)) => {
            if *index < elements.len() {
                elements.remove(*index);
            }
        }
        _ => {}
    }
}
