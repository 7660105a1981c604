//! Text-substitution template renderer used for object manifests and for
//! name/pod-name string fields. Placeholders have the syntax `{{.name}}`
//! and are looked up in a flat binding map; this is intentionally a
//! substitution engine, not a general expression language.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::{EngineError, ValidationError};

pub type Bindings = HashMap<String, String>;

/// Counter bound when expanding `count` object names from one `SubmitObj`.
pub const ENUM_PLACEHOLDER: &str = "_ENUM_";
/// The rendered name of the parent object, bound while expanding its pod names.
pub const NAME_PLACEHOLDER: &str = "_NAME_";
/// Iteration variable for range expansions (bound to the innermost dimension).
pub const INDEX_PLACEHOLDER: &str = "_INDEX_";

/// `{ range: { pattern, ranges: [ "a-b", ... ] } }`, as described for
/// `SubmitObj.pods`.
#[derive(Debug, Clone, Deserialize)]
pub struct PodsSpec {
    pub range: PodRange,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodRange {
    pub pattern: String,
    pub ranges: Vec<String>,
}

/// Render `template`, substituting every `{{.name}}` placeholder found in
/// `bindings`. Placeholders with no matching binding are left verbatim.
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        let rest = &template[i..];
        if rest.starts_with("{{.") {
            if let Some(end) = rest.find("}}") {
                let name = &rest[3..end];
                match bindings.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[..end + 2]),
                }
                i += end + 2;
                continue;
            }
        }
        let ch = rest.chars().next().expect("non-empty remainder");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Merge `overrides` onto `base`; later (override) keys win.
pub fn merge(base: &Bindings, overrides: &Bindings) -> Bindings {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Produce `count` distinct object names by substituting `_ENUM_` with
/// `0..count-1` into `nameformat`, in order.
///
/// `count > 1` combined with a `nameformat` that doesn't actually vary
/// across the enumeration (most commonly because it lacks `_ENUM_`)
/// deliberately fails fast with `ValidationError::DuplicateNames` rather
/// than silently creating colliding objects.
pub fn name_format(nameformat: &str, count: u32) -> Result<Vec<String>, EngineError> {
    let mut names = Vec::with_capacity(count as usize);
    for i in 0..count {
        let mut bindings = Bindings::new();
        bindings.insert(ENUM_PLACEHOLDER.to_string(), i.to_string());
        names.push(render(nameformat, &bindings));
    }

    if count > 1 && names.iter().all(|n| n == &names[0]) {
        return Err(EngineError::Validation(ValidationError::DuplicateNames {
            nameformat: nameformat.to_string(),
            count,
        }));
    }

    Ok(names)
}

/// Parse an inclusive `a-b` integer interval.
fn parse_range(raw: &str) -> Result<(i64, i64), ValidationError> {
    let dash_at = raw
        .get(1..)
        .and_then(|tail| tail.find('-'))
        .map(|idx| idx + 1)
        .or_else(|| raw.find('-'))
        .ok_or_else(|| ValidationError::BadRange(raw.to_string()))?;

    let (a, b) = raw.split_at(dash_at);
    let b = &b[1..];

    let a: i64 = a
        .parse()
        .map_err(|_| ValidationError::BadRange(raw.to_string()))?;
    let b: i64 = b
        .parse()
        .map_err(|_| ValidationError::BadRange(raw.to_string()))?;

    if a > b {
        return Err(ValidationError::BadRange(raw.to_string()));
    }

    Ok((a, b))
}

/// Enumerate expected pod names for one parent object: the Cartesian
/// product over every parsed range dimension, deduplicated while
/// preserving first-occurrence order. `_NAME_` is bound to `parent_name`;
/// `_INDEX_` is bound to the innermost (last) dimension's current value,
/// matching the common single-range case, while each dimension is also
/// exposed individually as `_INDEX0_`, `_INDEX1_`, ... for patterns that
/// need to distinguish multiple range dimensions.
pub fn enumerate_pods(
    parent_name: &str,
    spec: &PodsSpec,
    base: &Bindings,
) -> Result<Vec<String>, EngineError> {
    let dimensions = spec
        .range
        .ranges
        .iter()
        .map(|raw| parse_range(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut combos: Vec<Vec<i64>> = vec![vec![]];
    for (lo, hi) in &dimensions {
        let mut next = Vec::with_capacity(combos.len() * (*hi - *lo + 1).max(0) as usize);
        for combo in &combos {
            for v in *lo..=*hi {
                let mut extended = combo.clone();
                extended.push(v);
                next.push(extended);
            }
        }
        combos = next;
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for combo in combos {
        let mut bindings = base.clone();
        bindings.insert(NAME_PLACEHOLDER.to_string(), parent_name.to_string());
        if let Some(last) = combo.last() {
            bindings.insert(INDEX_PLACEHOLDER.to_string(), last.to_string());
        }
        for (dim, value) in combo.iter().enumerate() {
            bindings.insert(format!("_INDEX{}_", dim), value.to_string());
        }

        let name = render(&spec.range.pattern, &bindings);
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }

    Ok(out)
}
