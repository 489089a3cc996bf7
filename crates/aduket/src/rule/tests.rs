use super::*;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use serde::ser::Error as _;
use serde::Serializer;
use serde_json::json;

#[derive(Serialize)]
struct UserResponse {
    id: u32,
    name: String,
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("refusing to serialize"))
    }
}

fn json_header() -> HeaderMap {
    let mut header = HeaderMap::new();
    header.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    header
}

#[test]
fn test_default_rule() {
    let rule = ResponseRule::builder().build().unwrap();
    assert_eq!(rule.status(), StatusCode::OK);
    assert!(rule.header().is_empty());
    assert!(rule.body().is_none());
    assert!(rule.timeout().is_none());
    assert!(!rule.corrupt_body());
    assert_eq!(rule, ResponseRule::default());
}

#[test]
fn test_last_status_code_wins() {
    let rule = ResponseRule::from_options([status_code(201), status_code(418)]).unwrap();
    assert_eq!(rule.status(), StatusCode::IM_A_TEAPOT);
}

#[test]
fn test_body_options_overwrite_each_other() {
    let rule = ResponseRule::from_options([
        json_body(&json!({"a": 1})),
        string_body("plain"),
        byte_body(vec![1u8, 2, 3]),
    ])
    .unwrap();
    assert_eq!(rule.body().unwrap().as_ref(), &[1u8, 2, 3]);

    let rule = ResponseRule::from_options([byte_body(&b"raw"[..]), string_body("Hello")]).unwrap();
    assert_eq!(rule.body().unwrap().as_ref(), b"Hello");
}

#[test]
fn test_json_body_encoding() {
    let rule = ResponseRule::from_options([json_body(&UserResponse {
        id: 123,
        name: "kalt".to_string(),
    })])
    .unwrap();
    assert_eq!(rule.body().unwrap().as_ref(), br#"{"id":123,"name":"kalt"}"#);
}

#[test]
fn test_xml_body_uses_type_name_as_root() {
    let rule = ResponseRule::from_options([xml_body(&UserResponse {
        id: 1,
        name: "john".to_string(),
    })])
    .unwrap();

    let decoded = xml::decode(rule.body().unwrap()).unwrap();
    assert_eq!(
        serde_json::Value::Object(decoded),
        json!({"UserResponse": {"id": "1", "name": "john"}})
    );
}

#[test]
fn test_empty_string_body_is_not_absent() {
    let rule = ResponseRule::from_options([string_body("")]).unwrap();
    assert_eq!(rule.body().map(|b| b.len()), Some(0));
}

#[test]
fn test_header_option_replaces_wholesale() {
    let mut first = HeaderMap::new();
    first.insert("x-first", HeaderValue::from_static("1"));

    let rule = ResponseRule::from_options([header(first), header(json_header())]).unwrap();
    assert!(rule.header().get("x-first").is_none());
    assert_eq!(rule.header()[CONTENT_TYPE], "application/json");
}

#[test]
fn test_timeout_and_corrupt_body() {
    let rule = ResponseRule::from_options([timeout(Duration::from_millis(20)), corrupt_body()])
        .unwrap();
    assert_eq!(rule.timeout(), Some(Duration::from_millis(20)));
    assert!(rule.corrupt_body());
}

#[test]
fn test_invalid_status_code_is_rejected() {
    let err = ResponseRule::from_options([status_code(42)]).unwrap_err();
    assert_eq!(err, RuleError::InvalidStatus(42));
}

#[test]
fn test_unencodable_json_body_is_reported() {
    let err = ResponseRule::from_options([json_body(&Unserializable)]).unwrap_err();
    assert!(matches!(err, RuleError::Encode { format: "JSON", .. }));
}

#[test]
fn test_unencodable_xml_body_is_reported() {
    let err = ResponseRule::from_options([xml_body(&vec![1, 2, 3])]).unwrap_err();
    assert!(matches!(err, RuleError::Encode { format: "XML", .. }));

    // A later valid body does not hide the earlier failure.
    let err = ResponseRule::from_options([xml_body(&Unserializable), string_body("ok")])
        .unwrap_err();
    assert!(matches!(err, RuleError::Encode { format: "XML", .. }));
}

#[test]
fn test_builder_matches_options() {
    let built = ResponseRule::builder()
        .status_code(202)
        .header(json_header())
        .json_body(&json!({"ok": true}))
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let folded = ResponseRule::from_options([
        status_code(202),
        header(json_header()),
        json_body(&json!({"ok": true})),
        timeout(Duration::from_secs(1)),
    ])
    .unwrap();

    assert_eq!(built, folded);
}
