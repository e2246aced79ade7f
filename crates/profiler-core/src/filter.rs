//! Filter definitions: clauses, operators, column filters and the combined
//! filter state held by a [`FilteredBuffer`](crate::filtered_buffer::FilteredBuffer).
//!
//! Every type here (de)serializes with camelCase names so UI collaborators
//! can send filter payloads as JSON, e.g.
//!
//! ```json
//! {"field": "duration", "operator": "greaterThan", "value": 15, "typeHint": "number"}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::value::Value;

// =============================================================================
// Operators and type hints
// =============================================================================

/// Comparison operator of a [`FilterClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    IsNull,
    IsNotNull,
    In,
    /// Any operator name this build does not know. Never matches.
    #[serde(other)]
    Unrecognized,
}

impl FilterOperator {
    /// Parse an operator name (any case) or its symbolic form.
    ///
    /// Unknown names map to [`FilterOperator::Unrecognized`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => Self::Equals,
            "notequals" | "ne" | "!=" | "<>" => Self::NotEquals,
            "lessthan" | "lt" | "<" => Self::LessThan,
            "lessthanorequal" | "le" | "<=" => Self::LessThanOrEqual,
            "greaterthan" | "gt" | ">" => Self::GreaterThan,
            "greaterthanorequal" | "ge" | ">=" => Self::GreaterThanOrEqual,
            "contains" => Self::Contains,
            "notcontains" => Self::NotContains,
            "startswith" => Self::StartsWith,
            "notstartswith" => Self::NotStartsWith,
            "endswith" => Self::EndsWith,
            "notendswith" => Self::NotEndsWith,
            "isnull" => Self::IsNull,
            "isnotnull" => Self::IsNotNull,
            "in" => Self::In,
            _ => Self::Unrecognized,
        }
    }

    /// Operators that need no comparison value.
    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl FromStr for FilterOperator {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::NotStartsWith => "notStartsWith",
            Self::EndsWith => "endsWith",
            Self::NotEndsWith => "notEndsWith",
            Self::IsNull => "isNull",
            Self::IsNotNull => "isNotNull",
            Self::In => "in",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// How values are coerced before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeHint {
    String,
    Number,
    Date,
    #[serde(alias = "dateTime")]
    DateTime,
    #[serde(alias = "bool")]
    Boolean,
}

impl TypeHint {
    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

// =============================================================================
// Clauses
// =============================================================================

/// One `field operator value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Candidate set for [`FilterOperator::In`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<TypeHint>,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
            values: None,
            type_hint: None,
        }
    }

    /// A clause for a unary operator such as `IsNull`.
    #[must_use]
    pub fn unary(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
            values: None,
            type_hint: None,
        }
    }

    /// An `In` clause over `values`.
    #[must_use]
    pub fn one_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::In,
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
            type_hint: None,
        }
    }

    #[must_use]
    pub fn with_type_hint(mut self, hint: TypeHint) -> Self {
        self.type_hint = Some(hint);
        self
    }

    /// The explicit hint, or `Number` for numeric literals and `String` otherwise.
    #[must_use]
    pub fn effective_type_hint(&self) -> TypeHint {
        self.type_hint.unwrap_or_else(|| match &self.value {
            Some(v) if v.is_numeric() => TypeHint::Number,
            _ => TypeHint::String,
        })
    }
}

// =============================================================================
// Column filters
// =============================================================================

/// Per-column filter set from a grid header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ColumnFilter {
    /// Row value must equal one of the selected values (any case).
    /// An empty selection filters nothing.
    Categorical { selected: Vec<String> },
    /// Operator comparison. A missing operator, or a missing value for a
    /// binary operator, matches no rows.
    Operator {
        #[serde(default)]
        operator: Option<FilterOperator>,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        type_hint: Option<TypeHint>,
    },
}

impl ColumnFilter {
    /// Parse a column filter sent by the grid, e.g.
    /// `{"kind":"categorical","selected":["master"]}`.
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    #[must_use]
    pub fn categorical<S: Into<String>>(selected: impl IntoIterator<Item = S>) -> Self {
        Self::Categorical {
            selected: selected.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn operator(operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self::Operator {
            operator: Some(operator),
            value: Some(value.into()),
            type_hint: None,
        }
    }
}

// =============================================================================
// Filter state
// =============================================================================

/// Everything that decides whether a row is visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    /// AND-combined clauses.
    pub clauses: Vec<FilterClause>,
    /// Whether `clauses` take part in evaluation.
    pub clauses_enabled: bool,
    /// Free-text search across all values.
    pub quick_filter: Option<String>,
    /// AND-combined column filters keyed by field name.
    pub column_filters: BTreeMap<String, ColumnFilter>,
}

impl FilterState {
    /// Whether any part of the state restricts rows.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.has_clauses() || self.quick_filter.is_some() || !self.column_filters.is_empty()
    }

    #[must_use]
    pub fn has_clauses(&self) -> bool {
        self.clauses_enabled && !self.clauses.is_empty()
    }

    /// Replace the clause list. An empty list disables clause filtering.
    pub fn set_clauses(&mut self, clauses: Vec<FilterClause>) {
        self.clauses_enabled = !clauses.is_empty();
        self.clauses = clauses;
    }

    /// Set the quick filter. Surrounding whitespace is dropped; blank terms
    /// clear it.
    pub fn set_quick_filter(&mut self, term: Option<String>) {
        self.quick_filter = term
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Unified filter update: only the provided parts are replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRequest {
    /// New clause list. `Some(vec![])` clears the clauses.
    pub clauses: Option<Vec<FilterClause>>,
    /// New quick filter. `Some("")` clears it.
    pub quick_filter: Option<String>,
}

impl FilterRequest {
    /// Parse a filter update sent by the grid.
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    #[must_use]
    pub fn clauses(clauses: Vec<FilterClause>) -> Self {
        Self {
            clauses: Some(clauses),
            quick_filter: None,
        }
    }

    #[must_use]
    pub fn quick_filter(term: impl Into<String>) -> Self {
        Self {
            clauses: None,
            quick_filter: Some(term.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_parse_accepts_names_and_symbols() {
        assert_eq!(FilterOperator::parse("GreaterThan"), FilterOperator::GreaterThan);
        assert_eq!(FilterOperator::parse("notContains"), FilterOperator::NotContains);
        assert_eq!(FilterOperator::parse(">="), FilterOperator::GreaterThanOrEqual);
        assert_eq!(FilterOperator::parse("<>"), FilterOperator::NotEquals);
        assert_eq!(FilterOperator::parse("between"), FilterOperator::Unrecognized);
        assert_eq!("in".parse::<FilterOperator>().unwrap(), FilterOperator::In);
    }

    #[test]
    fn operator_display_round_trips_through_parse() {
        for op in [
            FilterOperator::Equals,
            FilterOperator::LessThanOrEqual,
            FilterOperator::NotEndsWith,
            FilterOperator::IsNotNull,
        ] {
            assert_eq!(FilterOperator::parse(&op.to_string()), op);
        }
    }

    #[test]
    fn clause_from_json() {
        let clause: FilterClause = serde_json::from_str(
            r#"{"field":"value","operator":"greaterThan","value":15,"typeHint":"number"}"#,
        )
        .unwrap();
        assert_eq!(
            clause,
            FilterClause::new("value", FilterOperator::GreaterThan, 15)
                .with_type_hint(TypeHint::Number)
        );
    }

    #[test]
    fn unknown_operator_deserializes_as_unrecognized() {
        let clause: FilterClause =
            serde_json::from_str(r#"{"field":"x","operator":"between","value":1}"#).unwrap();
        assert_eq!(clause.operator, FilterOperator::Unrecognized);
    }

    #[test]
    fn effective_type_hint_defaults() {
        assert_eq!(
            FilterClause::new("a", FilterOperator::Equals, 3).effective_type_hint(),
            TypeHint::Number
        );
        assert_eq!(
            FilterClause::new("a", FilterOperator::Equals, "3").effective_type_hint(),
            TypeHint::String
        );
        assert_eq!(
            FilterClause::new("a", FilterOperator::Equals, "2024-01-01")
                .with_type_hint(TypeHint::DateTime)
                .effective_type_hint(),
            TypeHint::DateTime
        );
    }

    #[test]
    fn column_filter_json_shapes() {
        let cat = ColumnFilter::from_json(r#"{"kind":"categorical","selected":["a","b"]}"#)
            .unwrap();
        assert_eq!(cat, ColumnFilter::categorical(["a", "b"]));

        let op = ColumnFilter::from_json(r#"{"kind":"operator","operator":"contains","value":"x"}"#)
            .unwrap();
        assert_eq!(op, ColumnFilter::operator(FilterOperator::Contains, "x"));

        let partial: ColumnFilter = serde_json::from_str(r#"{"kind":"operator"}"#).unwrap();
        assert!(matches!(
            partial,
            ColumnFilter::Operator {
                operator: None,
                value: None,
                ..
            }
        ));
    }

    #[test]
    fn state_activity() {
        let mut state = FilterState::default();
        assert!(!state.is_active());

        state.set_clauses(vec![FilterClause::unary("x", FilterOperator::IsNull)]);
        assert!(state.is_active());
        state.set_clauses(Vec::new());
        assert!(!state.is_active());

        state.set_quick_filter(Some("   ".into()));
        assert!(!state.is_active());
        state.set_quick_filter(Some("apple".into()));
        assert!(state.is_active());

        state.clear();
        state
            .column_filters
            .insert("name".into(), ColumnFilter::categorical(Vec::<String>::new()));
        assert!(state.is_active());
    }

    #[test]
    fn filter_request_from_json() {
        let req = FilterRequest::from_json(r#"{"quickFilter":"apple"}"#).unwrap();
        assert_eq!(req, FilterRequest::quick_filter("apple"));
        let req = FilterRequest::from_json(r#"{"clauses":[]}"#).unwrap();
        assert_eq!(req.clauses, Some(Vec::new()));
    }

    #[test]
    fn malformed_payloads_are_json_errors() {
        let err = FilterRequest::from_json(r#"{"clauses":"#).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
        assert!(err.remediation().is_some());
        let err = ColumnFilter::from_json(r#"{"kind":"histogram"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }

    #[test]
    fn quick_filter_is_trimmed() {
        let mut state = FilterState::default();
        state.set_quick_filter(Some("  apple \t".into()));
        assert_eq!(state.quick_filter.as_deref(), Some("apple"));
    }

    #[test]
    fn only_date_hints_are_temporal() {
        assert!(TypeHint::Date.is_temporal());
        assert!(TypeHint::DateTime.is_temporal());
        assert!(!TypeHint::Number.is_temporal());
        assert!(!TypeHint::String.is_temporal());
    }
}
