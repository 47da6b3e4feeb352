//! Query Normalizer.
//!
//! Converts the ordered key/value pairs of a request query string into a
//! typed [`FilterExpression`] plus [`ControlDirectives`]. Bracketed keys
//! are parsed structurally — `tuition[gte]=10000` becomes a comparison
//! clause, `location[city]=Boston` becomes an equality clause on the
//! nested path `location.city`. Operator keywords are matched against the
//! whole bracket segment, never as substrings, so a field named `budget`
//! is never rewritten.
//!
//! Malformed `page`/`limit` values silently fall back to their defaults;
//! malformed keys are passed through as plain equality filters.

use super::types::{
    ComparisonOp, ControlDirectives, FilterClause, FilterCondition, FilterExpression, FilterValue,
    SortDirection, SortKey,
};

/// Default page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size. The source system used both 10 and 20; CampDir
/// standardizes on 20 (see DESIGN.md).
pub const DEFAULT_LIMIT: u32 = 20;

/// Hard upper bound on the requested page size.
pub const MAX_LIMIT: u32 = 100;

/// Keys consumed as control directives, never as data filters.
const RESERVED_KEYS: &[&str] = &["select", "sort", "page", "limit"];

/// Normalize raw query pairs into a filter tree and control directives.
pub fn normalize(raw: &[(String, String)]) -> (FilterExpression, ControlDirectives) {
    let mut filter = FilterExpression::default();
    let mut directives = ControlDirectives::default();

    for (key, value) in raw {
        let (base, segment) = split_bracket(key);

        if RESERVED_KEYS.contains(&base) {
            // Reserved keys never become filters, bracketed or not; only
            // the plain form carries a directive.
            if segment.is_none() {
                apply_directive(&mut directives, base, value);
            }
            continue;
        }

        let clause = match segment {
            Some(segment) => match ComparisonOp::from_segment(segment) {
                Some(op) => {
                    let value = if op == ComparisonOp::In {
                        FilterValue::parse_list(value)
                    } else {
                        FilterValue::parse_scalar(value)
                    };
                    FilterClause {
                        path: base.to_string(),
                        condition: FilterCondition::Compare { op, value },
                    }
                }
                // Non-operator segment: one level of nesting, e.g.
                // location[city] -> location.city
                None => FilterClause {
                    path: format!("{base}.{segment}"),
                    condition: FilterCondition::Equals(FilterValue::parse_scalar(value)),
                },
            },
            None => FilterClause {
                path: base.to_string(),
                condition: FilterCondition::Equals(FilterValue::parse_scalar(value)),
            },
        };

        filter.clauses.push(clause);
    }

    (filter, directives)
}

/// Split `field[segment]` into `(field, Some(segment))`.
///
/// Keys without a well-formed bracket pair are returned whole — best
/// effort, not an error.
fn split_bracket(key: &str) -> (&str, Option<&str>) {
    let Some(open) = key.find('[') else {
        return (key, None);
    };
    if !key.ends_with(']') || open == 0 {
        return (key, None);
    }
    let base = &key[..open];
    let segment = &key[open + 1..key.len() - 1];
    if segment.is_empty() || segment.contains('[') {
        return (key, None);
    }
    (base, Some(segment))
}

/// Apply one control directive, with silent fallbacks on bad input.
fn apply_directive(directives: &mut ControlDirectives, key: &str, value: &str) {
    match key {
        "select" => {
            for field in value.split(',') {
                let field = field.trim();
                if !field.is_empty() && !directives.select.iter().any(|f| f == field) {
                    directives.select.push(field.to_string());
                }
            }
        }
        "sort" => {
            for field in value.split(',') {
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                let (field, direction) = match field.strip_prefix('-') {
                    Some(rest) => (rest, SortDirection::Desc),
                    None => (field, SortDirection::Asc),
                };
                if field.is_empty() {
                    continue;
                }
                directives.sort.push(SortKey {
                    field: field.to_string(),
                    direction,
                });
            }
        }
        "page" => {
            directives.page = value
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .unwrap_or(DEFAULT_PAGE);
        }
        "limit" => {
            directives.limit = value
                .parse::<u32>()
                .ok()
                .filter(|l| *l >= 1)
                .unwrap_or(DEFAULT_LIMIT)
                .min(MAX_LIMIT);
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn control_directives_round_trip() {
        let raw = pairs(&[
            ("select", "name,rating"),
            ("sort", "-rating,name"),
            ("page", "2"),
            ("limit", "5"),
        ]);
        let (filter, directives) = normalize(&raw);

        assert!(filter.is_empty());
        assert_eq!(directives.select, vec!["name", "rating"]);
        assert_eq!(
            directives.sort,
            vec![
                SortKey {
                    field: "rating".to_string(),
                    direction: SortDirection::Desc,
                },
                SortKey {
                    field: "name".to_string(),
                    direction: SortDirection::Asc,
                },
            ]
        );
        assert_eq!(directives.page, 2);
        assert_eq!(directives.limit, 5);
    }

    #[test]
    fn bracketed_operator_becomes_comparison() {
        let raw = pairs(&[("tuition", "10000")]);
        let (filter, _) = normalize(&raw);
        assert_eq!(
            filter.clauses[0].condition,
            FilterCondition::Equals(FilterValue::Int(10000))
        );

        let raw = pairs(&[("tuition[gte]", "10000")]);
        let (filter, _) = normalize(&raw);
        assert_eq!(filter.clauses[0].path, "tuition");
        assert_eq!(
            filter.clauses[0].condition,
            FilterCondition::Compare {
                op: ComparisonOp::Gte,
                value: FilterValue::Int(10000),
            }
        );
    }

    #[test]
    fn field_containing_operator_word_is_not_rewritten() {
        // "budget" contains "gt"; it must stay a plain equality filter.
        let raw = pairs(&[("budget", "5000"), ("gtfield", "x")]);
        let (filter, _) = normalize(&raw);

        assert_eq!(filter.clauses[0].path, "budget");
        assert!(matches!(
            filter.clauses[0].condition,
            FilterCondition::Equals(_)
        ));
        assert_eq!(filter.clauses[1].path, "gtfield");
        assert!(matches!(
            filter.clauses[1].condition,
            FilterCondition::Equals(_)
        ));
    }

    #[test]
    fn nested_bracket_key_becomes_dot_path() {
        let raw = pairs(&[("location[city]", "Boston")]);
        let (filter, _) = normalize(&raw);

        assert_eq!(filter.clauses[0].path, "location.city");
        assert_eq!(
            filter.clauses[0].condition,
            FilterCondition::Equals(FilterValue::Str("Boston".to_string()))
        );
    }

    #[test]
    fn in_operator_parses_comma_list() {
        let raw = pairs(&[("careers[in]", "Business,UI/UX")]);
        let (filter, _) = normalize(&raw);

        let FilterCondition::Compare { op, value } = &filter.clauses[0].condition else {
            panic!("expected comparison");
        };
        assert_eq!(*op, ComparisonOp::In);
        let FilterValue::List(items) = value else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn non_numeric_limit_falls_back_to_default() {
        let raw = pairs(&[("limit", "abc"), ("page", "-3")]);
        let (_, directives) = normalize(&raw);
        assert_eq!(directives.limit, DEFAULT_LIMIT);
        assert_eq!(directives.page, DEFAULT_PAGE);
    }

    #[test]
    fn zero_page_and_limit_fall_back_to_defaults() {
        let raw = pairs(&[("page", "0"), ("limit", "0")]);
        let (_, directives) = normalize(&raw);
        assert_eq!(directives.page, DEFAULT_PAGE);
        assert_eq!(directives.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn oversized_limit_is_capped() {
        let raw = pairs(&[("limit", "5000")]);
        let (_, directives) = normalize(&raw);
        assert_eq!(directives.limit, MAX_LIMIT);
    }

    #[test]
    fn reserved_keys_never_become_filters() {
        let raw = pairs(&[
            ("select", "name"),
            ("sort", "name"),
            ("page", "1"),
            ("limit", "10"),
            ("select[gte]", "2"),
            ("limit[in]", "3,4"),
        ]);
        let (filter, _) = normalize(&raw);
        assert!(filter.is_empty());
    }

    #[test]
    fn malformed_bracket_keys_pass_through_whole() {
        let raw = pairs(&[("title[", "x"), ("[city]", "y"), ("a[b][c]", "z")]);
        let (filter, _) = normalize(&raw);

        assert_eq!(filter.clauses[0].path, "title[");
        assert_eq!(filter.clauses[1].path, "[city]");
        assert_eq!(filter.clauses[2].path, "a[b][c]");
    }

    #[test]
    fn normalize_is_idempotent_over_the_same_input() {
        let raw = pairs(&[
            ("tuition[lte]", "12000"),
            ("housing", "true"),
            ("sort", "-created_at"),
            ("page", "3"),
        ]);
        let first = normalize(&raw);
        let second = normalize(&raw);
        assert_eq!(first, second);
    }

    #[test]
    fn select_deduplicates_preserving_order() {
        let raw = pairs(&[("select", "name,rating,name")]);
        let (_, directives) = normalize(&raw);
        assert_eq!(directives.select, vec!["name", "rating"]);
    }
}
