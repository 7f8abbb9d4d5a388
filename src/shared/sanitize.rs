//! HTML/script stripping for user-supplied text.
//!
//! Form payloads are free-form JSON edited in a browser. Every string that
//! is stored or echoed back goes through [`sanitize_text`], and nested
//! payloads through [`sanitize_value`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));

/// A `<script` that is never closed swallows the rest of the input.
static UNCLOSED_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*$").expect("valid regex"));

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)</?[a-zA-Z!][^>]*>").expect("valid regex"));

static SCRIPT_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(javascript|vbscript)\s*:").expect("valid regex"));

/// DOM event attributes only, so prose like `one = 5` or `only=2` survives.
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\bon(?:abort|animation[a-z]*|auxclick|before[a-z]+|blur|cancel|canplay[a-z]*",
        r"|change|click|close|contextmenu|copy|cut|dblclick|drag[a-z]*|drop|error",
        r"|focus[a-z]*|hashchange|input|invalid|key(?:down|press|up)|load[a-z]*|message",
        r"|mouse[a-z]+|paste|pointer[a-z]+|reset|resize|scroll|select|show|submit|toggle",
        r"|touch[a-z]+|transition[a-z]+|unload|wheel)",
        r#"\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#,
    ))
    .expect("valid regex")
});

static INLINE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

/// Strip markup and script vectors from a single string.
///
/// Plain comparison operators (`a < b`) survive; only things shaped like
/// tags are removed. Newlines are preserved.
pub fn sanitize_text(input: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(input, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = UNCLOSED_SCRIPT.replace_all(&text, "");
    let text = TAG.replace_all(&text, " ");
    let text = SCRIPT_URI.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    let text = INLINE_WHITESPACE.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Recursively sanitize every string and object key of a JSON value.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (sanitize_text(&k), sanitize_value(v)))
                .filter(|(k, _)| !k.is_empty())
                .collect();
            Value::Object(cleaned)
        }
        other => other,
    }
}

/// Sanitize every string inside a typed structure by round-tripping it
/// through `serde_json::Value`.
pub fn sanitize_serde<T>(value: T) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let raw = serde_json::to_value(value)?;
    serde_json::from_value(sanitize_value(raw))
}

/// Sanitize an optional string, mapping blank results to `None`.
pub fn sanitize_opt(input: Option<String>) -> Option<String> {
    input
        .map(|s| sanitize_text(&s))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strips_script_blocks_and_tags() {
        let input = "<p>Hello <b>world</b></p><script>alert('x')</script>";
        assert_eq!(sanitize_text(input), "Hello world");
    }

    #[test]
    fn test_strips_multiline_script_case_insensitive() {
        let input = "before<SCRIPT type=\"text/javascript\">\nvar a = 1;\n</Script>after";
        assert_eq!(sanitize_text(input), "beforeafter");
    }

    #[test]
    fn test_unclosed_script_removes_tail() {
        assert_eq!(sanitize_text("safe text <script>steal()"), "safe text");
    }

    #[test]
    fn test_event_handler_tag_removed() {
        assert_eq!(sanitize_text("<img src=x onerror=alert(1)>ok"), "ok");
    }

    #[test]
    fn test_javascript_uri_removed() {
        assert_eq!(sanitize_text("go to javascript:alert(1)"), "go to alert(1)");
    }

    #[test]
    fn test_bare_handler_text_removed() {
        assert_eq!(sanitize_text("x onclick=\"evil()\" y"), "x y");
    }

    #[test]
    fn test_prose_with_equals_survives() {
        let prose = "one = 5 workers, only=2 on site";
        assert_eq!(sanitize_text(prose), prose);
        assert_eq!(sanitize_text("x onMouseOver='evil()' y"), "x y");
    }

    #[test]
    fn test_comparison_operators_survive() {
        assert_eq!(sanitize_text("O2 < 19.5 and LEL > 10"), "O2 < 19.5 and LEL > 10");
    }

    #[test]
    fn test_newlines_preserved() {
        assert_eq!(sanitize_text("line one  \n  <i>line</i> two"), "line one\nline two");
    }

    #[test]
    fn test_nested_value_sanitized() {
        let input = json!({
            "hazards": ["<b>Chute</b>", {"note": "<script>x()</script>Gaz"}],
            "<i>key</i>": 3,
            "count": 2,
            "ok": true,
            "missing": null
        });
        let expected = json!({
            "hazards": ["Chute", {"note": "Gaz"}],
            "key": 3,
            "count": 2,
            "ok": true,
            "missing": null
        });
        assert_eq!(sanitize_value(input), expected);
    }

    #[test]
    fn test_keys_that_sanitize_to_empty_are_dropped() {
        let input = json!({"<script>a</script>": "v", "k": "v"});
        assert_eq!(sanitize_value(input), json!({"k": "v"}));
    }

    #[test]
    fn test_sanitize_serde_typed() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Item {
            description: String,
            level: u8,
        }
        let cleaned = sanitize_serde(vec![Item {
            description: "<em>Fall</em> risk".into(),
            level: 3,
        }])
        .unwrap();
        assert_eq!(
            cleaned,
            vec![Item {
                description: "Fall risk".into(),
                level: 3
            }]
        );
    }

    #[test]
    fn test_sanitize_opt_blank_is_none() {
        assert_eq!(sanitize_opt(Some("<br>".into())), None);
        assert_eq!(sanitize_opt(Some(" ok ".into())), Some("ok".into()));
        assert_eq!(sanitize_opt(None), None);
    }
}
