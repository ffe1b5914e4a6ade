//! Structural diff of two stores over the logical model.
//!
//! Differences are reported as human-readable lines keyed by element label;
//! an empty result is the canonical equality predicate for two stores.
//! Sets compare as multisets, numbers by value.

use crate::error::Result;
use crate::store::Store;
use crate::value::Value;
use std::collections::BTreeSet;

// Numeric values compare by value so an engine-narrowed write (REAL into an
// INTEGER column) still matches its exact counterpart.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Real(y)) | (Value::Real(y), Value::Int(x)) => *x as f64 == *y,
        _ => a == b,
    }
}

fn lists_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

fn multisets_equal(a: &[Value], b: &[Value]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    let key = |v: &Value| v.to_string();
    a.sort_by_key(key);
    b.sort_by_key(key);
    lists_equal(&a, &b)
}

fn format_list(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(Value::to_string).collect();
    format!("[{}]", parts.join(", "))
}

// Element labels of a collection, in id order.
fn labels(store: &Store, collection: &str) -> Result<Vec<String>> {
    Ok(store
        .read_scalar(collection, "label")?
        .into_iter()
        .filter_map(|v| v.as_text().map(str::to_string))
        .collect())
}

// Label presence differences plus the list of labels common to both stores.
fn diff_labels(
    a: &Store,
    b: &Store,
    collection: &str,
    diffs: &mut Vec<String>,
) -> Result<Vec<String>> {
    let labels_a = labels(a, collection)?;
    let labels_b = labels(b, collection)?;
    let set_a: BTreeSet<&String> = labels_a.iter().collect();
    let set_b: BTreeSet<&String> = labels_b.iter().collect();

    for label in &labels_a {
        if !set_b.contains(label) {
            diffs.push(format!(
                "{collection}: element '{label}' missing in second database"
            ));
        }
    }
    for label in &labels_b {
        if !set_a.contains(label) {
            diffs.push(format!(
                "{collection}: element '{label}' missing in first database"
            ));
        }
    }

    Ok(labels_a
        .into_iter()
        .filter(|l| set_b.contains(l))
        .collect())
}

// Attribute names common to both schema views, reporting one-sided ones.
fn common_attributes(
    collection: &str,
    kind: &str,
    a: Vec<String>,
    b: Vec<String>,
    diffs: &mut Vec<String>,
) -> Vec<String> {
    let set_a: BTreeSet<&String> = a.iter().collect();
    let set_b: BTreeSet<&String> = b.iter().collect();
    for name in &a {
        if !set_b.contains(name) {
            diffs.push(format!(
                "{collection}: {kind} '{name}' missing in second database"
            ));
        }
    }
    for name in &b {
        if !set_a.contains(name) {
            diffs.push(format!(
                "{collection}: {kind} '{name}' missing in first database"
            ));
        }
    }
    a.into_iter().filter(|n| set_b.contains(n)).collect()
}

fn scalar_parameter_columns(store: &Store, collection: &str) -> Vec<String> {
    let schema = store.schema_model();
    let Ok(table) = schema.collection(collection) else {
        return Vec::new();
    };
    table
        .value_columns()
        .filter(|c| !table.is_relation_column(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

fn companion_parameter_columns(store: &Store, collection: &str, vector: bool) -> Vec<String> {
    let schema = store.schema_model();
    let tables = if vector {
        schema.vector_tables(collection)
    } else {
        schema.set_tables(collection)
    };
    let mut columns = Vec::new();
    for table in tables {
        for column in table.value_columns() {
            if !table.is_relation_column(&column.name) {
                columns.push(column.name.clone());
            }
        }
    }
    columns
}

/// Differences in non-relation scalar attributes, keyed by label.
pub fn compare_scalar_parameters(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;
    let columns = common_attributes(
        collection,
        "scalar attribute",
        scalar_parameter_columns(a, collection),
        scalar_parameter_columns(b, collection),
        &mut diffs,
    );

    for label in &common_labels {
        for column in &columns {
            let va = a.read_scalar_by_label(collection, column, label)?;
            let vb = b.read_scalar_by_label(collection, column, label)?;
            if !values_equal(&va, &vb) {
                diffs.push(format!(
                    "{collection}: element '{label}' scalar '{column}' differs: {va} != {vb}"
                ));
            }
        }
    }
    Ok(diffs)
}

/// Differences in non-relation vector attributes (ordered comparison).
pub fn compare_vector_parameters(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;
    let columns = common_attributes(
        collection,
        "vector attribute",
        companion_parameter_columns(a, collection, true),
        companion_parameter_columns(b, collection, true),
        &mut diffs,
    );

    for label in &common_labels {
        for column in &columns {
            let va = a.read_vector_by_label(collection, column, label)?;
            let vb = b.read_vector_by_label(collection, column, label)?;
            if !lists_equal(&va, &vb) {
                diffs.push(format!(
                    "{collection}: element '{label}' vector '{column}' differs: {} != {}",
                    format_list(&va),
                    format_list(&vb)
                ));
            }
        }
    }
    Ok(diffs)
}

/// Differences in non-relation set attributes (multiset comparison).
pub fn compare_set_parameters(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;
    let columns = common_attributes(
        collection,
        "set attribute",
        companion_parameter_columns(a, collection, false),
        companion_parameter_columns(b, collection, false),
        &mut diffs,
    );

    for label in &common_labels {
        for column in &columns {
            let va = a.read_set_by_label(collection, column, label)?;
            let vb = b.read_set_by_label(collection, column, label)?;
            if !multisets_equal(&va, &vb) {
                diffs.push(format!(
                    "{collection}: element '{label}' set '{column}' differs: {} != {}",
                    format_list(&va),
                    format_list(&vb)
                ));
            }
        }
    }
    Ok(diffs)
}

/// Differences in scalar relations, compared by target label.
pub fn compare_scalar_relations(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;

    let relations_a = a.schema_model().scalar_relations(collection);
    let relations_b = b.schema_model().scalar_relations(collection);
    let names = common_attributes(
        collection,
        "scalar relation",
        relations_a.iter().map(|(c, _)| c.clone()).collect(),
        relations_b.iter().map(|(c, _)| c.clone()).collect(),
        &mut diffs,
    );

    for (relation, target) in relations_a {
        if !names.contains(&relation) {
            continue;
        }
        let labels_a = labels(a, collection)?;
        let labels_b = labels(b, collection)?;
        let values_a = a.read_scalar_relations(collection, &target, &relation)?;
        let values_b = b.read_scalar_relations(collection, &target, &relation)?;
        let by_label_a: std::collections::BTreeMap<&String, &Option<String>> =
            labels_a.iter().zip(values_a.iter()).collect();
        let by_label_b: std::collections::BTreeMap<&String, &Option<String>> =
            labels_b.iter().zip(values_b.iter()).collect();

        for label in &common_labels {
            let va = by_label_a.get(label).copied();
            let vb = by_label_b.get(label).copied();
            if va != vb {
                let show = |v: Option<&Option<String>>| {
                    v.and_then(|o| o.clone()).unwrap_or_else(|| "null".to_string())
                };
                diffs.push(format!(
                    "{collection}: element '{label}' relation '{relation}' differs: {} != {}",
                    show(va),
                    show(vb)
                ));
            }
        }
    }
    Ok(diffs)
}

fn compare_companion_relations(
    a: &Store,
    b: &Store,
    collection: &str,
    vector: bool,
) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;

    let schema_a = a.schema_model();
    let schema_b = b.schema_model();
    let (relations_a, relations_b) = if vector {
        (schema_a.vector_relations(collection), schema_b.vector_relations(collection))
    } else {
        (schema_a.set_relations(collection), schema_b.set_relations(collection))
    };
    let kind = if vector { "vector relation" } else { "set relation" };
    let names = common_attributes(
        collection,
        kind,
        relations_a.iter().map(|(_, c, _)| c.clone()).collect(),
        relations_b.iter().map(|(_, c, _)| c.clone()).collect(),
        &mut diffs,
    );

    for (_, relation, target) in relations_a {
        if !names.contains(&relation) {
            continue;
        }
        let labels_a = labels(a, collection)?;
        let labels_b = labels(b, collection)?;
        let (values_a, values_b) = if vector {
            (
                a.read_vector_relations(collection, &target, &relation)?,
                b.read_vector_relations(collection, &target, &relation)?,
            )
        } else {
            (
                a.read_set_relations(collection, &target, &relation)?,
                b.read_set_relations(collection, &target, &relation)?,
            )
        };
        let by_label_a: std::collections::BTreeMap<&String, &Vec<String>> =
            labels_a.iter().zip(values_a.iter()).collect();
        let by_label_b: std::collections::BTreeMap<&String, &Vec<String>> =
            labels_b.iter().zip(values_b.iter()).collect();

        let empty = Vec::new();
        for label in &common_labels {
            let mut va = by_label_a.get(label).copied().unwrap_or(&empty).clone();
            let mut vb = by_label_b.get(label).copied().unwrap_or(&empty).clone();
            if !vector {
                va.sort();
                vb.sort();
            }
            if va != vb {
                diffs.push(format!(
                    "{collection}: element '{label}' relation '{relation}' differs: [{}] != [{}]",
                    va.join(", "),
                    vb.join(", ")
                ));
            }
        }
    }
    Ok(diffs)
}

/// Differences in vector relations (ordered, by target label).
pub fn compare_vector_relations(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    compare_companion_relations(a, b, collection, true)
}

/// Differences in set relations (multiset, by target label).
pub fn compare_set_relations(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    compare_companion_relations(a, b, collection, false)
}

/// Differences in time-series groups, keyed by label; rows compare as
/// multisets of full cross-sections.
pub fn compare_time_series(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let common_labels = diff_labels(a, b, collection, &mut diffs)?;
    let groups = common_attributes(
        collection,
        "time series group",
        a.get_time_series_groups(collection)?,
        b.get_time_series_groups(collection)?,
        &mut diffs,
    );

    for label in &common_labels {
        for group in &groups {
            let id_a = a.get_element_id(collection, label)?;
            let id_b = b.get_element_id(collection, label)?;
            let mut rows_a: Vec<String> = a
                .read_element_time_series_group(collection, id_a, group, &[])?
                .iter()
                .map(|row| format_row(row))
                .collect();
            let mut rows_b: Vec<String> = b
                .read_element_time_series_group(collection, id_b, group, &[])?
                .iter()
                .map(|row| format_row(row))
                .collect();
            rows_a.sort();
            rows_b.sort();
            if rows_a != rows_b {
                diffs.push(format!(
                    "{collection}: element '{label}' time series '{group}' differs: \
                     {} row(s) != {} row(s)",
                    rows_a.len(),
                    rows_b.len()
                ));
            }
        }
    }
    Ok(diffs)
}

fn format_row(row: &std::collections::BTreeMap<String, Value>) -> String {
    let parts: Vec<String> = row.iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.join(", ")
}

/// Differences in file-backed time series paths.
pub fn compare_time_series_files(a: &Store, b: &Store, collection: &str) -> Result<Vec<String>> {
    let mut diffs = Vec::new();

    let files_columns = |store: &Store| -> Vec<String> {
        store
            .schema_model()
            .files_table(collection)
            .map(|t| t.value_columns().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    };
    let parameters = common_attributes(
        collection,
        "time series file parameter",
        files_columns(a),
        files_columns(b),
        &mut diffs,
    );

    for parameter in &parameters {
        let pa = a.read_time_series_file(collection, parameter)?;
        let pb = b.read_time_series_file(collection, parameter)?;
        if pa != pb {
            let show = |p: &Option<String>| p.clone().unwrap_or_else(|| "unset".to_string());
            diffs.push(format!(
                "{collection}: time series file '{parameter}' differs: {} != {}",
                show(&pa),
                show(&pb)
            ));
        }
    }
    Ok(diffs)
}

/// Walk every common collection, concatenating all per-kind differences.
/// Collections present in only one store are reported as such.
pub fn compare_databases(a: &Store, b: &Store) -> Result<Vec<String>> {
    let mut diffs = Vec::new();
    let collections_a = a.get_collections();
    let collections_b = b.get_collections();
    let set_a: BTreeSet<&String> = collections_a.iter().collect();
    let set_b: BTreeSet<&String> = collections_b.iter().collect();

    for collection in &collections_a {
        if !set_b.contains(collection) {
            diffs.push(format!("collection '{collection}' missing in second database"));
        }
    }
    for collection in &collections_b {
        if !set_a.contains(collection) {
            diffs.push(format!("collection '{collection}' missing in first database"));
        }
    }

    for collection in collections_a.iter().filter(|c| set_b.contains(*c)) {
        diffs.extend(compare_scalar_parameters(a, b, collection)?);
        diffs.extend(compare_vector_parameters(a, b, collection)?);
        diffs.extend(compare_set_parameters(a, b, collection)?);
        diffs.extend(compare_scalar_relations(a, b, collection)?);
        diffs.extend(compare_vector_relations(a, b, collection)?);
        diffs.extend(compare_set_relations(a, b, collection)?);
        diffs.extend(compare_time_series(a, b, collection)?);
        diffs.extend(compare_time_series_files(a, b, collection)?);
    }

    // The per-kind walks each report label presence, so the same
    // missing-element line can surface more than once.
    let mut seen = BTreeSet::new();
    diffs.retain(|line| seen.insert(line.clone()));
    Ok(diffs)
}
