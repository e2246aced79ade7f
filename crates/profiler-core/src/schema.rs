//! Field resolution for captured rows.
//!
//! Filters name fields by string, so every row type exposes its fields
//! through a [`Schema`]: a list of typed accessors for the known columns
//! plus an optional accessor for the row's extension map. Name lookup goes
//!
//! 1. exact known-field name
//! 2. case-insensitive known-field name (pre-built lower-cased index)
//! 3. exact extension key
//! 4. case-insensitive extension key
//!
//! and yields `None` when nothing matches. [`DisplayRow`] is the converted
//! form produced by a row converter and resolves names the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::value::{FieldMap, Value};

/// Reads one known field from a row.
pub type Accessor<T> = fn(&T) -> Value;

/// Reads a row's extension map, if it has one.
pub type ExtensionAccessor<T> = fn(&T) -> Option<&FieldMap>;

/// Anything the predicate engine can evaluate against.
pub trait FieldSource {
    /// Resolve a field by name. `None` means the field does not exist.
    fn field(&self, name: &str) -> Option<Value>;

    /// Visit every field value, including extension entries, until `visit`
    /// returns true. Returns whether it did.
    fn any_value(&self, visit: &mut dyn FnMut(&Value) -> bool) -> bool;
}

struct FieldDef<T> {
    name: String,
    accessor: Accessor<T>,
}

/// Named accessors for a row type.
pub struct Schema<T> {
    fields: Vec<FieldDef<T>>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
    extension: Option<ExtensionAccessor<T>>,
}

impl<T> Schema<T> {
    #[must_use]
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            fields: Vec::new(),
            extension: None,
        }
    }

    /// Known field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    fn resolve(&self, name: &str) -> Option<&FieldDef<T>> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
            .map(|&idx| &self.fields[idx])
    }

    /// Resolve `name` against `row`.
    #[must_use]
    pub fn get_field_value(&self, row: &T, name: &str) -> Option<Value> {
        if let Some(def) = self.resolve(name) {
            return Some((def.accessor)(row));
        }
        let extension = self.extension.and_then(|ext| ext(row))?;
        lookup_map(extension, name).cloned()
    }

    /// Borrow `row` as a [`FieldSource`].
    #[must_use]
    pub fn view<'a>(&'a self, row: &'a T) -> SchemaRow<'a, T> {
        SchemaRow { schema: self, row }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .field("extension", &self.extension.is_some())
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDef<T>>,
    extension: Option<ExtensionAccessor<T>>,
}

impl<T> SchemaBuilder<T> {
    /// Declare a known field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, accessor: Accessor<T>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            accessor,
        });
        self
    }

    /// Declare where the row keeps its extension map.
    #[must_use]
    pub fn extension(mut self, accessor: ExtensionAccessor<T>) -> Self {
        self.extension = Some(accessor);
        self
    }

    /// Build the schema and its name indexes. On duplicate names the first
    /// declaration wins.
    #[must_use]
    pub fn build(self) -> Schema<T> {
        let mut exact = HashMap::with_capacity(self.fields.len());
        let mut folded = HashMap::with_capacity(self.fields.len());
        for (idx, def) in self.fields.iter().enumerate() {
            exact.entry(def.name.clone()).or_insert(idx);
            folded.entry(def.name.to_lowercase()).or_insert(idx);
        }
        Schema {
            fields: self.fields,
            exact,
            folded,
            extension: self.extension,
        }
    }
}

/// A row paired with its schema.
pub struct SchemaRow<'a, T> {
    schema: &'a Schema<T>,
    row: &'a T,
}

impl<T> FieldSource for SchemaRow<'_, T> {
    fn field(&self, name: &str) -> Option<Value> {
        self.schema.get_field_value(self.row, name)
    }

    fn any_value(&self, visit: &mut dyn FnMut(&Value) -> bool) -> bool {
        for def in &self.schema.fields {
            if visit(&(def.accessor)(self.row)) {
                return true;
            }
        }
        self.schema
            .extension
            .and_then(|ext| ext(self.row))
            .is_some_and(|map| map.values().any(|v| visit(v)))
    }
}

/// Grid-facing form of a row, produced by a row converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub additional_data: FieldMap,
}

impl DisplayRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set an extension entry.
    #[must_use]
    pub fn with_additional(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(name.into(), value.into());
        self
    }
}

impl FieldSource for DisplayRow {
    fn field(&self, name: &str) -> Option<Value> {
        lookup_map(&self.fields, name)
            .or_else(|| lookup_map(&self.additional_data, name))
            .cloned()
    }

    fn any_value(&self, visit: &mut dyn FnMut(&Value) -> bool) -> bool {
        self.fields
            .values()
            .chain(self.additional_data.values())
            .any(|v| visit(v))
    }
}

fn lookup_map<'m>(map: &'m FieldMap, name: &str) -> Option<&'m Value> {
    if let Some(v) = map.get(name) {
        return Some(v);
    }
    let folded = name.to_lowercase();
    map.iter()
        .find(|(key, _)| key.to_lowercase() == folded)
        .map(|(_, v)| v)
}
