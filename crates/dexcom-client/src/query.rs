//! Query-string encoding for readings requests

use reqwest::Url;
use serde_json::Value;

/// Append `params` to `url`'s query string.
///
/// Strings, numbers and booleans are written as their plain text; arrays and
/// objects as compact JSON. `Null` values are skipped. Escaping is left to
/// the URL's form encoder.
pub fn encode_query(url: &mut Url, params: &[(&str, Value)]) {
    let pairs: Vec<(&str, String)> = params
        .iter()
        .filter_map(|(key, value)| encode_value(value).map(|encoded| (*key, encoded)))
        .collect();
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, &value);
    }
}

fn encode_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://share2.dexcom.com/ShareWebServices/Services/Publisher/Read").unwrap()
    }

    #[test]
    fn scalars_are_plain_text() {
        let mut url = base();
        encode_query(
            &mut url,
            &[
                ("sessionId", json!("0f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0")),
                ("minutes", json!(1440)),
                ("maxCount", json!(1)),
                ("flag", json!(true)),
            ],
        );
        assert_eq!(
            url.query(),
            Some("sessionId=0f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0&minutes=1440&maxCount=1&flag=true")
        );
    }

    #[test]
    fn nulls_are_skipped() {
        let mut url = base();
        encode_query(&mut url, &[("a", Value::Null), ("b", json!(2))]);
        assert_eq!(url.query(), Some("b=2"));

        let mut url = base();
        encode_query(&mut url, &[("a", Value::Null)]);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn containers_are_json_and_escaped() {
        let mut url = base();
        encode_query(&mut url, &[("ids", json!([1, 2])), ("q", json!("a b&c"))]);
        assert_eq!(url.query(), Some("ids=%5B1%2C2%5D&q=a+b%26c"));

        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(decoded[0], ("ids".into(), "[1,2]".into()));
        assert_eq!(decoded[1], ("q".into(), "a b&c".into()));
    }
}
