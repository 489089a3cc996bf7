//! Assertions against a [`RequestRecorder`].
//!
//! Every assertion returns `true` on success. On mismatch it reports an [`AssertionFailure`] to
//! the given [`Reporter`] and returns `false`.

use super::{AssertionFailure, Body, RequestRecorder, Reporter};
use crate::codec::xml;
use hyper::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use similar::TextDiff;
use std::collections::BTreeMap;

impl RequestRecorder {
    /// Compare the raw request body with `expected`.
    pub fn assert_string_body_eq(&self, t: &impl Reporter, expected: &str) -> bool {
        let data = self.data().unwrap_or_default();
        let actual = String::from_utf8_lossy(&data);
        if actual == expected {
            return true;
        }
        t.fail(
            AssertionFailure::new("String bodies are not equal!")
                .with_detail(format!("Actual:   {actual:?}\nExpected: {expected:?}")),
        );
        false
    }

    /// Compare the structured body with `expected` serialized as JSON.
    pub fn assert_json_body_eq<T: Serialize + ?Sized>(&self, t: &impl Reporter, expected: &T) -> bool {
        let expected = match serde_json::to_value(expected) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                t.fail(AssertionFailure::new(format!(
                    "Expected JSON body must be an object, got {other}"
                )));
                return false;
            }
            Err(e) => {
                t.fail(AssertionFailure::new(format!(
                    "Failed to encode expected JSON body: {e}"
                )));
                return false;
            }
        };
        compare_bodies(t, "JSON Bodies are not equal!", expected, self.body())
    }

    /// Compare the structured body with `expected` serialized as XML, rooted at its type name.
    pub fn assert_xml_body_eq<T: Serialize>(&self, t: &impl Reporter, expected: &T) -> bool {
        self.assert_xml_body_eq_with_root(t, xml::type_root_name::<T>(), expected)
    }

    pub fn assert_xml_body_eq_with_root<T: Serialize + ?Sized>(
        &self,
        t: &impl Reporter,
        root: &str,
        expected: &T,
    ) -> bool {
        let decoded = serde_json::to_value(expected)
            .map_err(|e| e.to_string())
            .and_then(|value| xml::encode(root, &value).map_err(|e| e.to_string()))
            .and_then(|encoded| xml::decode(&encoded).map_err(|e| e.to_string()));

        match decoded {
            Ok(expected) => compare_bodies(t, "XML Bodies are not equal!", expected, self.body()),
            Err(reason) => {
                t.fail(AssertionFailure::new(format!(
                    "Failed to encode expected XML body: {reason}"
                )));
                false
            }
        }
    }

    pub fn assert_param_eq(&self, t: &impl Reporter, name: &str, expected: &str) -> bool {
        let actual = self.param(name);
        if actual.as_deref() == Some(expected) {
            return true;
        }
        t.fail(
            AssertionFailure::new(format!("Param name '{name}' is not equal to '{expected}'"))
                .with_detail(format!("Actual:   {actual:?}\nExpected: {expected:?}")),
        );
        false
    }

    /// Compare every value of query parameter `name`, in order. A missing parameter has no values.
    pub fn assert_query_param_eq(&self, t: &impl Reporter, name: &str, expected: &[&str]) -> bool {
        let actual = self.query_param(name).unwrap_or_default();
        compare_values(t, "QueryParam", name, expected, &actual)
    }

    /// Compare every value of form field `name`, in order. A missing field has no values.
    pub fn assert_form_param_eq(&self, t: &impl Reporter, name: &str, expected: &[&str]) -> bool {
        let actual = self.form_param(name).unwrap_or_default();
        compare_values(t, "FormParam", name, expected, &actual)
    }

    /// Every expected header must be present with at least the expected values.
    /// Headers that were not asked for are ignored.
    pub fn assert_header_contains(&self, t: &impl Reporter, expected: &HeaderMap) -> bool {
        let actual = self.header();
        if header_contains(expected, &actual) {
            return true;
        }
        t.fail(
            AssertionFailure::new("HTTP Headers do not contain the expected values")
                .with_detail(diff(&header_json(expected), &header_json(&actual))),
        );
        false
    }

    /// Every expected header must be present with exactly the expected values, in order.
    /// Headers that were not asked for are ignored.
    pub fn assert_header_eq(&self, t: &impl Reporter, expected: &HeaderMap) -> bool {
        let actual = self.header();
        if header_equals(expected, &actual) {
            return true;
        }
        t.fail(
            AssertionFailure::new("HTTP Headers are not equal")
                .with_detail(diff(&header_json(expected), &header_json(&actual))),
        );
        false
    }

    pub fn assert_no_request(&self, t: &impl Reporter) -> bool {
        if !self.received() {
            return true;
        }
        t.fail(AssertionFailure::new(format!(
            "Expected no request, but {} request(s) were received",
            self.request_count()
        )));
        false
    }
}

fn compare_bodies(t: &impl Reporter, message: &str, expected: Body, actual: Body) -> bool {
    if expected == actual {
        return true;
    }
    let expected = pretty(&Value::Object(expected));
    let actual = pretty(&Value::Object(actual));
    t.fail(AssertionFailure::new(message).with_detail(diff(&expected, &actual)));
    false
}

fn compare_values(
    t: &impl Reporter,
    kind: &str,
    name: &str,
    expected: &[&str],
    actual: &[String],
) -> bool {
    if actual.iter().map(String::as_str).eq(expected.iter().copied()) {
        return true;
    }
    t.fail(
        AssertionFailure::new(format!("{kind} name '{name}' is not equal to {expected:?}"))
            .with_detail(format!("Actual:   {actual:?}\nExpected: {expected:?}")),
    );
    false
}

pub(crate) fn header_contains(expected: &HeaderMap, actual: &HeaderMap) -> bool {
    expected.keys().all(|name| {
        let present: Vec<_> = actual.get_all(name).iter().collect();
        !present.is_empty() && expected.get_all(name).iter().all(|v| present.contains(&v))
    })
}

pub(crate) fn header_equals(expected: &HeaderMap, actual: &HeaderMap) -> bool {
    expected
        .keys()
        .all(|name| expected.get_all(name).iter().eq(actual.get_all(name).iter()))
}

fn header_json(header: &HeaderMap) -> String {
    let mut map: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, value) in header {
        map.entry(name.as_str())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    serde_json::to_string_pretty(&map).unwrap_or_default()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn diff(expected: &str, actual: &str) -> String {
    TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(3)
        .header("expected", "actual")
        .to_string()
}
