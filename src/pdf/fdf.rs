//! FDF fill-data builder
//!
//! Produces the minimal FDF document `pdftk fill_form` consumes: a fixed
//! header, one `<< /T (key) /V (value)>>` line per field, a fixed trailer.
//!
//! Keys and values are written inside PDF literal strings without escaping.
//! A value containing an unbalanced `(`, `)` or a `\` corrupts the document;
//! this is a known gap and is kept as is.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt::Write;

pub const FDF_HEADER: &str = "%FDF-1.2
%,,oe\"
1 0 obj
<<
/FDF << /Fields [";

pub const FDF_FOOTER: &str = "]
>>
>>
endobj
trailer
<<
/Root 1 0 R
>>
%%EOF";

/// Render a scalar JSON value the way it is written into the FDF.
///
/// Strings are taken verbatim, numbers and booleans use their JSON spelling,
/// `null` becomes an empty string. Arrays and objects are rejected.
pub fn render_value(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(Error::InvalidFieldValue {
            name: name.to_string(),
            reason: "expected a string, number, boolean or null".to_string(),
        }),
    }
}

/// Build the FDF document for a flat field-name → value map.
pub fn build_fdf(values: &Map<String, Value>) -> Result<String> {
    let mut fdf = String::with_capacity(FDF_HEADER.len() + FDF_FOOTER.len() + values.len() * 32);

    fdf.push_str(FDF_HEADER);
    fdf.push('\n');

    for (key, value) in values {
        let value = render_value(key, value)?;
        // writing into a String cannot fail
        let _ = writeln!(fdf, "<< /T ({}) /V ({})>>", key, value);
    }

    fdf.push_str(FDF_FOOTER);
    fdf.push('\n');

    Ok(fdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_build_single_value() {
        let fdf = build_fdf(&map(json!({"name": "Alice"}))).unwrap();
        assert_eq!(
            fdf,
            "%FDF-1.2\n%,,oe\"\n1 0 obj\n<<\n/FDF << /Fields [\n\
             << /T (name) /V (Alice)>>\n\
             ]\n>>\n>>\nendobj\ntrailer\n<<\n/Root 1 0 R\n>>\n%%EOF\n"
        );
    }

    #[test]
    fn test_build_empty_map() {
        let fdf = build_fdf(&Map::new()).unwrap();
        assert_eq!(fdf, format!("{}\n{}\n", FDF_HEADER, FDF_FOOTER));
    }

    #[test]
    fn test_build_keeps_dotted_keys_and_orders_entries() {
        let fdf = build_fdf(&map(json!({"row.2.name": "b", "row.1.name": "a"}))).unwrap();
        let lines: Vec<&str> = fdf.lines().filter(|l| l.starts_with("<< /T")).collect();
        assert_eq!(
            lines,
            vec![
                "<< /T (row.1.name) /V (a)>>",
                "<< /T (row.2.name) /V (b)>>"
            ]
        );
    }

    #[test]
    fn test_build_does_not_escape_delimiters() {
        let fdf = build_fdf(&map(json!({"note": "a (b) c"}))).unwrap();
        assert!(fdf.contains("<< /T (note) /V (a (b) c)>>"));
    }

    #[rstest]
    #[case(json!("text"), "text")]
    #[case(json!(42), "42")]
    #[case(json!(1.5), "1.5")]
    #[case(json!(true), "true")]
    #[case(json!(null), "")]
    fn test_render_scalar(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(render_value("f", &value).unwrap(), expected);
    }

    #[test]
    fn test_reject_nested_values() {
        let result = build_fdf(&map(json!({"ok": "x", "bad": ["a", "b"]})));
        match result {
            Err(Error::InvalidFieldValue { name, .. }) => assert_eq!(name, "bad"),
            other => panic!("expected InvalidFieldValue, got {:?}", other),
        }
        assert!(render_value("obj", &json!({"k": 1})).is_err());
    }
}
