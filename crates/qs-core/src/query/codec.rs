//! Query-string codec with typed coercion
//!
//! Parsing never fails: anything that does not look like a number, a boolean
//! or a separated sequence stays a string. Numeral-looking strings such as a
//! postal code `007` come back as numbers; that loss is accepted.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::{QueryState, QueryValue};

/// Integer or decimal numeral, optionally negative.
static NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("Invalid numeral regex"));

const ARRAY_SUFFIX: &str = "[]";

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Separator joining sequence elements inside a single value
    pub array_separator: char,

    /// Coerce numeral-looking values to numbers
    pub parse_numbers: bool,

    /// Coerce `true` / `false` to booleans
    pub parse_booleans: bool,

    /// Drop `key=` pairs when serializing
    pub skip_empty_strings: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            array_separator: '|',
            parse_numbers: true,
            parse_booleans: true,
            skip_empty_strings: true,
        }
    }
}

/// Per-call serialization options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    pub skip_empty_strings: bool,
    pub sort: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            skip_empty_strings: true,
            sort: true,
        }
    }
}

/// Converts between query strings and [`QueryState`]
#[derive(Debug, Clone, Default)]
pub struct QueryCodec {
    config: CodecConfig,
}

impl QueryCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Parse a query string. A leading `?` is ignored.
    ///
    /// Keys with a `[]` suffix are always sequences. A key repeated in the
    /// input accumulates its decoded values, uncoerced, into a sequence.
    pub fn parse(&self, input: &str) -> QueryState {
        let input = input.strip_prefix('?').unwrap_or(input);
        if input.is_empty() {
            return QueryState::new();
        }

        // Decoded values per key, each flagged when it came from `key[]`
        let mut collected: IndexMap<String, Vec<(String, bool)>> = IndexMap::new();
        for (raw_key, raw_value) in form_urlencoded::parse(input.as_bytes()) {
            let (key, bracketed) = match raw_key.strip_suffix(ARRAY_SUFFIX) {
                Some(key) => (key, true),
                None => (&*raw_key, false),
            };
            if key.is_empty() {
                continue;
            }

            collected
                .entry(key.to_string())
                .or_default()
                .push((raw_value.into_owned(), bracketed));
        }

        collected
            .into_iter()
            .map(|(key, raws)| (key, self.resolve(&raws)))
            .collect()
    }

    /// Serialize with the configured empty-string policy and sorted keys.
    pub fn serialize(&self, state: &QueryState) -> String {
        self.serialize_with(
            state,
            SerializeOptions {
                skip_empty_strings: self.config.skip_empty_strings,
                ..SerializeOptions::default()
            },
        )
    }

    /// Serialize without a leading `?`.
    pub fn serialize_with(&self, state: &QueryState, options: SerializeOptions) -> String {
        let mut entries: Vec<(&String, &QueryValue)> = state.iter().collect();
        if options.sort {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }

        let separator = self.config.array_separator.to_string();
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (key, value) in entries {
            match value {
                QueryValue::String(s) if s.is_empty() && options.skip_empty_strings => {}
                QueryValue::List(items) => {
                    out.append_pair(&format!("{key}{ARRAY_SUFFIX}"), &items.join(&separator));
                }
                scalar => {
                    if let Some(text) = scalar.to_scalar_text() {
                        out.append_pair(key, &text);
                    }
                }
            }
        }
        out.finish()
    }

    fn resolve(&self, raws: &[(String, bool)]) -> QueryValue {
        if let [(raw, false)] = raws {
            return self.coerce(raw);
        }

        let items = raws
            .iter()
            .flat_map(|(raw, bracketed)| {
                if *bracketed || raw.contains(self.config.array_separator) {
                    self.split(raw)
                } else {
                    vec![raw.clone()]
                }
            })
            .collect();
        QueryValue::List(items)
    }

    fn coerce(&self, raw: &str) -> QueryValue {
        if self.config.parse_numbers && NUMERAL.is_match(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                return QueryValue::Number(n);
            }
        }
        if self.config.parse_booleans {
            match raw {
                "true" => return QueryValue::Bool(true),
                "false" => return QueryValue::Bool(false),
                _ => {}
            }
        }
        if raw.contains(self.config.array_separator) {
            return QueryValue::List(self.split(raw));
        }
        QueryValue::String(raw.to_string())
    }

    fn split(&self, raw: &str) -> Vec<String> {
        if raw.is_empty() {
            return Vec::new();
        }
        raw.split(self.config.array_separator)
            .map(String::from)
            .collect()
    }
}

/// Parse with the default configuration.
pub fn parse(input: &str) -> QueryState {
    QueryCodec::default().parse(input)
}

/// Serialize with the default configuration.
pub fn serialize(state: &QueryState) -> String {
    QueryCodec::default().serialize(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
        assert!(parse("?").is_empty());
    }

    #[test]
    fn test_parse_coercion() {
        let state = parse("?pageNumber=3&ratio=0.5&neg=-2&add=true&edit=false&name=alice");

        assert_eq!(state.get("pageNumber"), Some(&QueryValue::Number(3.0)));
        assert_eq!(state.get("ratio"), Some(&QueryValue::Number(0.5)));
        assert_eq!(state.get("neg"), Some(&QueryValue::Number(-2.0)));
        assert_eq!(state.get("add"), Some(&QueryValue::Bool(true)));
        assert_eq!(state.get("edit"), Some(&QueryValue::Bool(false)));
        assert_eq!(state.get("name"), Some(&QueryValue::from("alice")));
        assert!(state.get("missing").is_none());
    }

    #[test]
    fn test_booleans_are_case_sensitive() {
        let state = parse("a=True&b=FALSE");
        assert_eq!(state.get("a"), Some(&QueryValue::from("True")));
        assert_eq!(state.get("b"), Some(&QueryValue::from("FALSE")));
    }

    #[test]
    fn test_numeral_pattern_is_strict() {
        let state = parse("a=1e3&b=0x10&c=1.&d=.5&e=12abc");
        for key in ["a", "b", "c", "d", "e"] {
            assert!(state.get(key).unwrap().as_str().is_some(), "{key} should stay a string");
        }
    }

    #[test]
    fn test_leading_zero_string_becomes_number() {
        // Postal codes like "007" cannot be told apart from numbers.
        let state = parse("zip=007");
        assert_eq!(state.get("zip"), Some(&QueryValue::Number(7.0)));
        assert_eq!(serialize(&state), "zip=7");
    }

    #[test]
    fn test_separator_splits_without_coercing_elements() {
        let state = parse("ids=1%7C2%7Cx");
        assert_eq!(state.get("ids"), Some(&QueryValue::from(vec!["1", "2", "x"])));
    }

    #[test]
    fn test_bracketed_key_is_always_a_list() {
        let state = parse("tags%5B%5D=red&empty[]=&pair[]=a|b");
        assert_eq!(state.get("tags"), Some(&QueryValue::from(vec!["red"])));
        assert_eq!(state.get("empty"), Some(&QueryValue::List(Vec::new())));
        assert_eq!(state.get("pair"), Some(&QueryValue::from(vec!["a", "b"])));
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let state = parse("k=1&k=two");
        assert_eq!(state.get("k"), Some(&QueryValue::from(vec!["1", "two"])));
    }

    #[test]
    fn test_repeated_keys_keep_raw_text() {
        let state = parse("k=007&k=x&r=1.50&r[]=a|b");
        assert_eq!(state.get("k"), Some(&QueryValue::from(vec!["007", "x"])));
        assert_eq!(state.get("r"), Some(&QueryValue::from(vec!["1.50", "a", "b"])));
    }

    #[test]
    fn test_malformed_pairs_degrade_to_strings() {
        let state = parse("flag&=orphan&a=%ZZ");
        assert_eq!(state.get("flag"), Some(&QueryValue::from("")));
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("a"), Some(&QueryValue::from("%ZZ")));
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let state = parse("search=hello+world&city=S%C3%A3o%20Paulo");
        assert_eq!(state.get("search"), Some(&QueryValue::from("hello world")));
        assert_eq!(state.get("city"), Some(&QueryValue::from("São Paulo")));
    }

    #[test]
    fn test_serialize_sorts_and_skips_empty_strings() {
        let state = QueryState::new()
            .with("b", 2)
            .with("search", "")
            .with("a", true);
        assert_eq!(serialize(&state), "a=true&b=2");
    }

    #[test]
    fn test_serialize_keeps_empty_strings_when_asked() {
        let codec = QueryCodec::default();
        let state = QueryState::new().with("search", "");
        let options = SerializeOptions {
            skip_empty_strings: false,
            sort: true,
        };
        assert_eq!(codec.serialize_with(&state, options), "search=");
    }

    #[test]
    fn test_serialize_unsorted_follows_insertion_order() {
        let codec = QueryCodec::default();
        let state = QueryState::new().with("z", 1).with("a", 2);
        let options = SerializeOptions {
            sort: false,
            ..SerializeOptions::default()
        };
        assert_eq!(codec.serialize_with(&state, options), "z=1&a=2");
    }

    #[test]
    fn test_serialize_lists_use_bracketed_key() {
        let state = QueryState::new().with("tags", vec!["a", "b"]);
        assert_eq!(serialize(&state), "tags%5B%5D=a%7Cb");
        assert_eq!(parse(&serialize(&state)), state);
    }

    #[test]
    fn test_integral_numbers_have_no_fraction() {
        let state = QueryState::new().with("pageSize", 20).with("ratio", 1.25);
        assert_eq!(serialize(&state), "pageSize=20&ratio=1.25");
    }

    #[test]
    fn test_round_trip_is_idempotent_after_first_pass() {
        let original = QueryState::new()
            .with("zip", "007")
            .with("flag", "true")
            .with("name", "a b&c")
            .with("mixed", "x|y")
            .with("list", vec!["1", "z"])
            .with("single", vec!["only"])
            .with("n", 3.5)
            .with("empty", "")
            .with("ok", false);

        let once = parse(&serialize(&original));
        let twice = parse(&serialize(&once));
        assert_eq!(once, twice);

        assert_eq!(once.get("zip"), Some(&QueryValue::Number(7.0)));
        assert_eq!(once.get("flag"), Some(&QueryValue::Bool(true)));
        assert_eq!(once.get("name"), Some(&QueryValue::from("a b&c")));
        assert_eq!(once.get("mixed"), Some(&QueryValue::from(vec!["x", "y"])));
        assert!(once.get("empty").is_none());
    }

    #[test]
    fn test_custom_separator() {
        let codec = QueryCodec::new(CodecConfig {
            array_separator: ',',
            ..CodecConfig::default()
        });
        let state = codec.parse("ids=a,b");
        assert_eq!(state.get("ids"), Some(&QueryValue::from(vec!["a", "b"])));
        assert_eq!(codec.serialize(&state), "ids%5B%5D=a%2Cb");
    }

    #[test]
    fn test_coercion_can_be_disabled() {
        let codec = QueryCodec::new(CodecConfig {
            parse_numbers: false,
            parse_booleans: false,
            ..CodecConfig::default()
        });
        let state = codec.parse("n=1&b=true");
        assert_eq!(state.get("n"), Some(&QueryValue::from("1")));
        assert_eq!(state.get("b"), Some(&QueryValue::from("true")));
    }
}
