//! FQL v4 wire expressions
//!
//! Fauna's v4 HTTP API takes a query as a JSON tree. Each helper here builds
//! one node of that tree; object literals are wrapped in `{"object": ...}`
//! as the wire format requires.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// A query expression ready to be posted to Fauna
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Expr(Value);

impl Expr {
    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr(Value::String(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr(Value::String(s))
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr(Value::from(n))
    }
}

pub fn null() -> Expr {
    Expr(Value::Null)
}

pub fn index(name: &str) -> Expr {
    Expr(json!({ "index": name }))
}

pub fn collection(name: &str) -> Expr {
    Expr(json!({ "collection": name }))
}

pub fn match_index(index: Expr, terms: impl Into<Expr>) -> Expr {
    Expr(json!({ "match": index.0, "terms": terms.into().0 }))
}

/// `Match(index)` without terms: the index's full set.
pub fn match_all(index: Expr) -> Expr {
    Expr(json!({ "match": index.0 }))
}

pub fn get(reference: Expr) -> Expr {
    Expr(json!({ "get": reference.0 }))
}

pub fn exists(reference: Expr) -> Expr {
    Expr(json!({ "exists": reference.0 }))
}

/// `Select(path, from)`; `path` is a list of field names.
pub fn select(path: &[&str], from: Expr) -> Expr {
    let path = if path.len() == 1 {
        Value::String(path[0].to_string())
    } else {
        Value::Array(path.iter().map(|p| Value::String(p.to_string())).collect())
    };
    Expr(json!({ "select": path, "from": from.0 }))
}

pub fn if_(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr(json!({ "if": condition.0, "then": then.0, "else": otherwise.0 }))
}

/// An object literal; nested values must already be expressions.
pub fn object<I>(fields: I) -> Expr
where
    I: IntoIterator<Item = (&'static str, Expr)>,
{
    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.0))
        .collect();
    Expr(json!({ "object": map }))
}

pub fn create(collection: Expr, params: Expr) -> Expr {
    Expr(json!({ "create": collection.0, "params": params.0 }))
}

pub fn update(reference: Expr, params: Expr) -> Expr {
    Expr(json!({ "update": reference.0, "params": params.0 }))
}

pub fn delete(reference: Expr) -> Expr {
    Expr(json!({ "delete": reference.0 }))
}

pub fn paginate(set: Expr, size: u32) -> Expr {
    Expr(json!({ "paginate": set.0, "size": size }))
}

/// Continue a pagination from the cursor a previous page returned.
pub fn paginate_after(set: Expr, size: u32, cursor: Value) -> Expr {
    Expr(json!({ "paginate": set.0, "size": size, "after": cursor }))
}

pub fn lambda(var_name: &str, body: Expr) -> Expr {
    Expr(json!({ "lambda": var_name, "expr": body.0 }))
}

pub fn var(name: &str) -> Expr {
    Expr(json!({ "var": name }))
}

pub fn map(collection: Expr, func: Expr) -> Expr {
    Expr(json!({ "map": func.0, "collection": collection.0 }))
}

pub fn filter(collection: Expr, func: Expr) -> Expr {
    Expr(json!({ "filter": func.0, "collection": collection.0 }))
}

pub fn starts_with(value: Expr, search: impl Into<Expr>) -> Expr {
    Expr(json!({ "startswith": value.0, "search": search.into().0 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_index() {
        let expr = get(match_index(index("content_by_filename"), "posts/a.md"));
        assert_eq!(
            expr.into_value(),
            json!({"get": {"match": {"index": "content_by_filename"}, "terms": "posts/a.md"}})
        );
    }

    #[test]
    fn test_object_literal_is_wrapped() {
        let expr = object([("data", object([("filename", Expr::from("a.md"))]))]);
        assert_eq!(
            expr.into_value(),
            json!({"object": {"data": {"object": {"filename": "a.md"}}}})
        );
    }

    #[test]
    fn test_select_single_vs_path() {
        assert_eq!(
            select(&["ref"], var("doc")).into_value(),
            json!({"select": "ref", "from": {"var": "doc"}})
        );
        assert_eq!(
            select(&["data", "content"], var("doc")).into_value(),
            json!({"select": ["data", "content"], "from": {"var": "doc"}})
        );
    }

    #[test]
    fn test_map_filter_argument_order() {
        let expr = map(
            filter(paginate(match_all(index("all")), 10), lambda("r", var("r"))),
            lambda("r", var("r")),
        );
        let value = expr.into_value();
        assert_eq!(value["map"], json!({"lambda": "r", "expr": {"var": "r"}}));
        assert_eq!(value["collection"]["filter"]["lambda"], json!("r"));
        assert_eq!(value["collection"]["collection"]["size"], json!(10));
    }
}
