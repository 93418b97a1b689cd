//! Structured types and the tolerant response parser.
//!
//! The service is inconsistent about its schema: the room name is sometimes a string and
//! sometimes a list, and the remaining balance shows up under a handful of different keys. Rather
//! than assuming one fixed layout, the parser evaluates an ordered list of [`BalanceRule`]s and
//! keeps the first one that produces a number.

use std::fmt::{self, Display};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Error;

/// The lowest balance accepted as plausible.
pub const MIN_BALANCE: f64 = 0.0;
/// The highest balance accepted as plausible.
pub const MAX_BALANCE: f64 = 99_999.0;

/// Candidate balance keys, canonical key first.
pub const BALANCE_KEYS: &[&str] = &["odd", "balance", "remain", "surplus", "dianliang"];

/// The body key holding the room name.
const ROOM_KEY: &str = "roomfullname";
/// The body key holding the list of module records.
const MODULES_KEY: &str = "modlist";
/// The module key holding the recent daily usage.
const WEEKLY_KEY: &str = "weekuselist";

/// Substrings of `message_` meaning the account has no room bound to it.
const UNBOUND_MARKERS: &[&str] = &["未绑定", "不存在", "unbound", "not exist"];

/// A JSON object.
pub type Object = Map<String, Value>;

/// The outer response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Status code, `0` on success. Usually a number, occasionally a numeric string.
    #[serde(rename = "code_")]
    pub code: Value,
    /// Human-readable status message.
    #[serde(rename = "message_", default)]
    pub message: Option<String>,
    /// The JSON-encoded payload.
    #[serde(default)]
    pub body: Option<Value>,
}

impl Envelope {
    /// Parses an envelope from the raw response bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Envelope`] with the offending JSON path if the bytes are not a valid
    /// envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Envelope, Error> {
        let de = &mut serde_json::Deserializer::from_slice(bytes);

        serde_path_to_error::deserialize(de).map_err(Error::Envelope)
    }

    /// Returns whether the envelope reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match &self.code {
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.trim() == "0",
            _ => false,
        }
    }

    /// Consumes the envelope and extracts the usage information from its body.
    ///
    /// # Errors
    ///
    /// - [`Error::Unbound`] or [`Error::Rejected`] if the envelope reports failure.
    /// - [`Error::MissingBody`] or [`Error::Body`] if the body is absent or malformed.
    /// - Any error of [`Usage::from_body`].
    pub fn into_usage(self) -> Result<Usage, Error> {
        if !self.is_success() {
            return Err(self.into_rejection());
        }

        let body = self.into_body()?;

        Usage::from_body(&body)
    }

    fn into_rejection(self) -> Error {
        let message = self.message.unwrap_or_default();
        let lowercase = message.to_lowercase();

        if UNBOUND_MARKERS.iter().any(|marker| lowercase.contains(marker)) {
            Error::Unbound
        } else {
            Error::Rejected {
                code: plain_text(&self.code),
                message,
            }
        }
    }

    fn into_body(self) -> Result<Object, Error> {
        match self.body {
            Some(Value::String(encoded)) => {
                let de = &mut serde_json::Deserializer::from_str(&encoded);

                serde_path_to_error::deserialize(de).map_err(Error::Body)
            }
            Some(Value::Object(body)) => Ok(body),
            _ => Err(Error::MissingBody),
        }
    }
}

/// The room a student account is bound to, in whichever shape the service returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Room {
    /// A single free-text name.
    Name(String),
    /// A list of name parts, e.g. building, floor and room number.
    Parts(Vec<String>),
}

impl Room {
    fn from_value(value: Option<&Value>) -> Room {
        match value {
            Some(Value::String(name)) => Room::Name(name.clone()),
            Some(Value::Array(parts)) => Room::Parts(parts.iter().map(plain_text).collect()),
            None | Some(Value::Null) => Room::Parts(Vec::new()),
            Some(other) => Room::Name(other.to_string()),
        }
    }

    /// Returns whether the room carries no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Room::Name(name) => name.trim().is_empty(),
            Room::Parts(parts) => parts.iter().all(|part| part.trim().is_empty()),
        }
    }
}

impl Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Name(name) => f.write_str(name),
            Room::Parts(parts) => f.write_str(&parts.join(" ")),
        }
    }
}

/// Electricity usage for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    /// The date as reported by the service.
    pub date: Option<String>,
    /// Units used that day.
    pub usage: Option<String>,
    /// The day of the week as reported by the service.
    pub weekday: Option<String>,
}

impl DailyUsage {
    fn from_object(entry: &Object) -> DailyUsage {
        let field = |key: &str| entry.get(key).filter(|v| !v.is_null()).map(plain_text);

        DailyUsage {
            date: field("date"),
            usage: field("dayuse"),
            weekday: field("weekday"),
        }
    }
}

/// The result of a successful usage query.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    /// The room the account is bound to.
    pub room: Room,
    /// Remaining electricity, in kWh.
    pub balance: f64,
    /// Recent daily usage, oldest first. May be empty.
    pub weekly: Vec<DailyUsage>,
}

impl Usage {
    /// Parses a complete response, envelope included.
    ///
    /// # Errors
    ///
    /// See [`Envelope::from_slice`] and [`Envelope::into_usage`].
    pub fn from_json(bytes: &[u8]) -> Result<Usage, Error> {
        Envelope::from_slice(bytes)?.into_usage()
    }

    /// Extracts usage information from a decoded body.
    ///
    /// # Errors
    ///
    /// - [`Error::BalanceNotFound`] if no balance rule yields a number.
    /// - [`Error::BalanceOutOfRange`] if the balance lies outside
    ///   [`MIN_BALANCE`]..=[`MAX_BALANCE`].
    pub fn from_body(body: &Object) -> Result<Usage, Error> {
        let modules: Vec<&Object> = body
            .get(MODULES_KEY)
            .and_then(Value::as_array)
            .map(|records| records.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();

        let (balance, raw) = balance_rules()
            .find_map(|rule| rule.apply(&modules, body))
            .ok_or(Error::BalanceNotFound)?;

        if !(MIN_BALANCE..=MAX_BALANCE).contains(&balance) {
            return Err(Error::BalanceOutOfRange(plain_text(raw)));
        }

        let weekly = modules
            .iter()
            .find_map(|module| module.get(WEEKLY_KEY).and_then(Value::as_array))
            .map(|days| {
                days.iter()
                    .filter_map(Value::as_object)
                    .map(DailyUsage::from_object)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Usage {
            room: Room::from_value(body.get(ROOM_KEY)),
            balance,
            weekly,
        })
    }
}

/// A single place to look for the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRule {
    /// Look up the key in every module record, in order.
    Module(&'static str),
    /// Look up the key directly on the body.
    Body(&'static str),
}

impl BalanceRule {
    /// Returns the parsed balance together with the raw value it came from.
    fn apply<'a>(self, modules: &[&'a Object], body: &'a Object) -> Option<(f64, &'a Value)> {
        match self {
            BalanceRule::Module(key) => modules
                .iter()
                .copied()
                .find_map(|module| module.get(key).and_then(numeric)),
            BalanceRule::Body(key) => body.get(key).and_then(numeric),
        }
    }
}

/// Returns the balance rules in the order they are evaluated.
///
/// Every key is tried across all module records before falling back to the body itself.
pub fn balance_rules() -> impl Iterator<Item = BalanceRule> {
    let modules = BALANCE_KEYS.iter().copied().map(BalanceRule::Module);
    let body = BALANCE_KEYS.iter().copied().map(BalanceRule::Body);

    modules.chain(body)
}

/// Interprets a JSON number or numeric string as a finite `f64`.
fn numeric(value: &Value) -> Option<(f64, &Value)> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number.filter(|n| n.is_finite()).map(|n| (n, value))
}

/// Renders a JSON value as text, without quotes for strings.
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(body: &Value) -> Vec<u8> {
        json!({
            "code_": 0,
            "message_": "成功",
            "body": body.to_string(),
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn it_should_parse_double_encoded_body() {
        let bytes = envelope(&json!({
            "roomfullname": "西区 3 栋 402",
            "modlist": [{ "odd": "56.31" }],
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert_eq!(usage.room, Room::Name("西区 3 栋 402".to_string()));
        assert!((usage.balance - 56.31).abs() < f64::EPSILON);
        assert!(usage.weekly.is_empty());
    }

    #[test]
    fn it_should_preserve_room_list_shape() {
        let bytes = envelope(&json!({
            "roomfullname": ["西区", "3栋", "402"],
            "modlist": [{ "odd": 12 }],
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert_eq!(
            usage.room,
            Room::Parts(vec!["西区".into(), "3栋".into(), "402".into()])
        );
        assert_eq!(usage.room.to_string(), "西区 3栋 402");
    }

    #[test]
    fn it_should_default_missing_room_to_empty_list() {
        let bytes = envelope(&json!({ "modlist": [{ "odd": 1 }] }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert_eq!(usage.room, Room::Parts(vec![]));
        assert!(usage.room.is_empty());
    }

    #[test]
    fn it_should_accept_string_status_code() {
        let bytes = json!({
            "code_": "0",
            "body": json!({ "modlist": [{ "odd": 3 }] }).to_string(),
        })
        .to_string();

        assert!(Usage::from_json(bytes.as_bytes()).is_ok());
    }

    #[test]
    fn it_should_accept_already_decoded_body() {
        let bytes = json!({
            "code_": 0,
            "body": { "modlist": [{ "odd": 3 }] },
        })
        .to_string();

        assert!(Usage::from_json(bytes.as_bytes()).is_ok());
    }

    #[test]
    fn it_should_prefer_canonical_key_over_synonyms() {
        let bytes = envelope(&json!({
            "modlist": [{ "balance": 80 }, { "odd": 20 }],
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert!((usage.balance - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn it_should_skip_non_numeric_candidates() {
        let bytes = envelope(&json!({
            "modlist": [{ "odd": "暂无" }, "garbage", { "remain": "7.5" }],
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert!((usage.balance - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn it_should_fall_back_to_body_keys() {
        let bytes = envelope(&json!({
            "modlist": [{ "name": "electricity" }],
            "surplus": 42,
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert!((usage.balance - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn it_should_fail_when_balance_is_absent() {
        let bytes = envelope(&json!({ "modlist": [] }));

        assert!(matches!(
            Usage::from_json(&bytes),
            Err(Error::BalanceNotFound)
        ));
    }

    #[test]
    fn it_should_reject_out_of_range_balances() {
        for raw in [json!(-0.01), json!("100000"), json!(1e9)] {
            let bytes = envelope(&json!({ "modlist": [{ "odd": raw }] }));

            match Usage::from_json(&bytes) {
                Err(Error::BalanceOutOfRange(text)) => assert!(!text.is_empty()),
                other => panic!("expected range error, got {other:?}"),
            }
        }
    }

    #[test]
    fn it_should_accept_range_bounds() {
        for raw in [json!(0), json!(99999)] {
            let bytes = envelope(&json!({ "modlist": [{ "odd": raw }] }));

            assert!(Usage::from_json(&bytes).is_ok());
        }
    }

    #[test]
    fn it_should_include_raw_value_in_range_error() {
        let bytes = envelope(&json!({ "modlist": [{ "odd": "-12.5" }] }));
        let err = Usage::from_json(&bytes).unwrap_err();

        assert_eq!(err.to_string(), "anomalous balance value: -12.5");
    }

    #[test]
    fn it_should_normalize_unbound_messages() {
        for message in ["该学号未绑定房间", "账户不存在", "Account does NOT EXIST"] {
            let bytes = json!({ "code_": 1, "message_": message }).to_string();

            assert!(matches!(
                Usage::from_json(bytes.as_bytes()),
                Err(Error::Unbound)
            ));
        }
    }

    #[test]
    fn it_should_surface_other_rejections() {
        let bytes = json!({ "code_": 500, "message_": "系统繁忙" }).to_string();

        match Usage::from_json(bytes.as_bytes()) {
            Err(Error::Rejected { code, message }) => {
                assert_eq!(code, "500");
                assert_eq!(message, "系统繁忙");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn it_should_report_malformed_body() {
        let bytes = json!({ "code_": 0, "body": "{not json" }).to_string();

        assert!(matches!(
            Usage::from_json(bytes.as_bytes()),
            Err(Error::Body(_))
        ));
    }

    #[test]
    fn it_should_report_envelope_path_on_error() {
        let err = Envelope::from_slice(br#"{"message_": 5}"#).unwrap_err();

        assert!(err.to_string().contains("message_"));
    }

    #[test]
    fn it_should_extract_weekly_usage() {
        let bytes = envelope(&json!({
            "modlist": [
                { "odd": 30 },
                { "weekuselist": [
                    { "date": "2024-05-01", "dayuse": "3.2", "weekday": "星期三" },
                    { "date": "2024-05-02", "dayuse": 4 },
                    "skip me",
                ] },
            ],
        }));
        let usage = Usage::from_json(&bytes).unwrap();

        assert_eq!(
            usage.weekly,
            vec![
                DailyUsage {
                    date: Some("2024-05-01".into()),
                    usage: Some("3.2".into()),
                    weekday: Some("星期三".into()),
                },
                DailyUsage {
                    date: Some("2024-05-02".into()),
                    usage: Some("4".into()),
                    weekday: None,
                },
            ]
        );
    }

    #[test]
    fn balance_rules_try_modules_before_body() {
        let rules: Vec<_> = balance_rules().collect();

        assert_eq!(rules.len(), BALANCE_KEYS.len() * 2);
        assert_eq!(rules[0], BalanceRule::Module("odd"));
        assert_eq!(rules[BALANCE_KEYS.len()], BalanceRule::Body("odd"));
    }
}
