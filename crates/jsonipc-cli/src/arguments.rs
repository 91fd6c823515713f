//! Conversion of command-line words into command arguments.

use serde_json::Value;

/// Parses `raw` as JSON, falling back to a plain string.
///
/// `200` becomes a number and `true` a boolean, while `pause` or
/// `/tmp/a file.mkv` are sent verbatim as strings.
pub(crate) fn parse_argument(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

pub(crate) fn parse_arguments(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|word| parse_argument(word)).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("200", json!(200))]
    #[case("1.5", json!(1.5))]
    #[case("true", json!(true))]
    #[case("null", json!(null))]
    #[case("[\"a\", 1]", json!(["a", 1]))]
    #[case("\"quoted\"", json!("quoted"))]
    #[case("pause", json!("pause"))]
    #[case("/tmp/a file.mkv", json!("/tmp/a file.mkv"))]
    #[case("", json!(""))]
    fn words_become_json_values(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(parse_argument(raw), expected);
    }

    #[rstest]
    fn preserves_argument_order() {
        let words = vec![String::from("volume"), String::from("50")];
        assert_eq!(parse_arguments(&words), vec![json!("volume"), json!(50)]);
    }
}
