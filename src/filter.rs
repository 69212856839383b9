// ABOUTME: Keyword filter narrowing engine listings by substring match on named fields.
// ABOUTME: Fields are scanned one after another and their matches concatenated.

use serde_json::Value;

/// Keep the items whose `fields` contain `keyword`.
///
/// A string field matches by substring. A list field is joined with single
/// spaces first. Other values and missing fields never match.
///
/// Each field is scanned over the whole input in turn and the matches are
/// appended, so an item matching on two fields appears twice. Within one
/// field's matches the input order is kept.
pub fn filter_by_keyword(items: &[Value], fields: &[&str], keyword: &str) -> Vec<Value> {
    fields
        .iter()
        .flat_map(|field| {
            items
                .iter()
                .filter(move |item| field_contains(item, field, keyword))
                .cloned()
        })
        .collect()
}

fn field_contains(item: &Value, field: &str, keyword: &str) -> bool {
    match item.get(field) {
        Some(Value::String(s)) => s.contains(keyword),
        Some(Value::Array(values)) => {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            joined.contains(keyword)
        }
        _ => false,
    }
}
