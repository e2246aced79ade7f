//! Predicate evaluation over a [`FieldSource`].
//!
//! A row is visible when it passes all three phases of a [`FilterState`]:
//! every enabled clause, the quick filter, and every column filter.
//!
//! Null handling per operator:
//!
//! | Operator                      | Null handling                              |
//! |-------------------------------|--------------------------------------------|
//! | `IsNull` / `IsNotNull`        | tests for null directly                    |
//! | `Equals` / `NotEquals`        | both null are equal, one null is unequal   |
//! | ordering operators            | either side null never matches             |
//! | `Contains` and friends        | either side null never matches             |
//! | negated text operators        | null field always matches                  |
//! | `In`                          | null field or empty set never matches      |
//!
//! Malformed input fails closed: unknown operators, number parse failures and
//! half-specified column filters match nothing.

use std::cmp::Ordering;

use crate::filter::{ColumnFilter, FilterClause, FilterOperator, FilterState, TypeHint};
use crate::schema::FieldSource;
use crate::value::Value;

/// Evaluate the whole filter state against one row.
pub fn evaluate_row<S: FieldSource + ?Sized>(source: &S, state: &FilterState) -> bool {
    if state.has_clauses() && !state.clauses.iter().all(|c| evaluate_clause(source, c)) {
        return false;
    }

    if let Some(term) = &state.quick_filter {
        if !quick_filter_matches(source, term) {
            return false;
        }
    }

    state
        .column_filters
        .iter()
        .all(|(field, filter)| evaluate_column_filter(source, field, filter))
}

/// Case-insensitive substring search across every value of the row.
pub fn quick_filter_matches<S: FieldSource + ?Sized>(source: &S, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    source.any_value(&mut |v| !v.is_null() && v.to_folded().contains(&needle))
}

/// Evaluate a single clause.
pub fn evaluate_clause<S: FieldSource + ?Sized>(source: &S, clause: &FilterClause) -> bool {
    let field = non_null(source.field(&clause.field));
    let value = clause.value.as_ref().filter(|v| !v.is_null());
    evaluate_operator(
        clause.operator,
        field.as_ref(),
        value,
        clause.values.as_deref(),
        clause.effective_type_hint(),
    )
}

/// Evaluate one column filter against the value of `field`.
pub fn evaluate_column_filter<S: FieldSource + ?Sized>(
    source: &S,
    field: &str,
    filter: &ColumnFilter,
) -> bool {
    match filter {
        ColumnFilter::Categorical { selected } => {
            if selected.is_empty() {
                return true;
            }
            let actual = source
                .field(field)
                .map(|v| v.to_folded())
                .unwrap_or_default();
            selected.iter().any(|s| s.to_lowercase() == actual)
        }
        ColumnFilter::Operator {
            operator,
            value,
            type_hint,
        } => {
            let Some(operator) = *operator else {
                return false;
            };
            if value.is_none() && !operator.is_unary() {
                return false;
            }
            let clause = FilterClause {
                field: field.to_string(),
                operator,
                value: value.clone(),
                values: None,
                type_hint: *type_hint,
            };
            evaluate_clause(source, &clause)
        }
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

fn evaluate_operator(
    operator: FilterOperator,
    field: Option<&Value>,
    value: Option<&Value>,
    values: Option<&[Value]>,
    hint: TypeHint,
) -> bool {
    match operator {
        FilterOperator::IsNull => field.is_none(),
        FilterOperator::IsNotNull => field.is_some(),
        FilterOperator::Equals => values_equal(field, value, hint) == Some(true),
        FilterOperator::NotEquals => values_equal(field, value, hint) == Some(false),
        FilterOperator::LessThan => compare(field, value, hint).is_some_and(Ordering::is_lt),
        FilterOperator::LessThanOrEqual => compare(field, value, hint).is_some_and(Ordering::is_le),
        FilterOperator::GreaterThan => compare(field, value, hint).is_some_and(Ordering::is_gt),
        FilterOperator::GreaterThanOrEqual => {
            compare(field, value, hint).is_some_and(Ordering::is_ge)
        }
        FilterOperator::Contains => text_test(field, value, |h, n| h.contains(n)),
        FilterOperator::StartsWith => text_test(field, value, |h, n| h.starts_with(n)),
        FilterOperator::EndsWith => text_test(field, value, |h, n| h.ends_with(n)),
        FilterOperator::NotContains => {
            field.is_none() || !text_test(field, value, |h, n| h.contains(n))
        }
        FilterOperator::NotStartsWith => {
            field.is_none() || !text_test(field, value, |h, n| h.starts_with(n))
        }
        FilterOperator::NotEndsWith => {
            field.is_none() || !text_test(field, value, |h, n| h.ends_with(n))
        }
        FilterOperator::In => in_set(field, values),
        FilterOperator::Unrecognized => false,
    }
}

/// Type-aware equality. `None` means the sides could not be compared.
fn values_equal(field: Option<&Value>, value: Option<&Value>, hint: TypeHint) -> Option<bool> {
    let (a, b) = match (field, value) {
        (None, None) => return Some(true),
        (Some(a), Some(b)) => (a, b),
        _ => return Some(false),
    };
    if hint.is_temporal() {
        // Unparseable dates count as null.
        return Some(a.to_timestamp_millis() == b.to_timestamp_millis());
    }
    match hint {
        TypeHint::Number => Some(a.to_number()? == b.to_number()?),
        TypeHint::Boolean => Some(a.to_bool() == b.to_bool()),
        _ => Some(a.to_folded() == b.to_folded()),
    }
}

fn compare(field: Option<&Value>, value: Option<&Value>, hint: TypeHint) -> Option<Ordering> {
    let (a, b) = (field?, value?);
    if hint.is_temporal() {
        return Some(a.to_timestamp_millis()?.cmp(&b.to_timestamp_millis()?));
    }
    match hint {
        TypeHint::Number => a.to_number()?.partial_cmp(&b.to_number()?),
        _ => Some(a.to_folded().cmp(&b.to_folded())),
    }
}

fn text_test(field: Option<&Value>, value: Option<&Value>, test: fn(&str, &str) -> bool) -> bool {
    match (field, value) {
        (Some(haystack), Some(needle)) => test(&haystack.to_folded(), &needle.to_folded()),
        _ => false,
    }
}

fn in_set(field: Option<&Value>, values: Option<&[Value]>) -> bool {
    let (Some(field), Some(values)) = (field, values) else {
        return false;
    };
    if values.is_empty() {
        return false;
    }
    let actual = field.to_folded();
    values.iter().any(|v| v.to_folded() == actual)
}
