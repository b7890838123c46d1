//! Status document parsing.
//!
//! An AirBeam device answers `GET /status` with a flat property list:
//!
//! ```xml
//! <properties>
//!   <property name="motionDetected" value="no"/>
//!   <property name="motionLevel" value="0.0312"/>
//!   <property name="state" value="idle"/>
//! </properties>
//! ```
//!
//! [`RawStatus`] is the decoded name/value map of one such response.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::{ClientError, Result};

const ROOT_ELEMENT: &str = "properties";

#[derive(Debug, Deserialize)]
struct PropertyList {
    #[serde(rename = "property", default)]
    properties: Vec<PropertyElement>,
}

#[derive(Debug, Deserialize)]
struct PropertyElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value", default)]
    value: String,
}

/// Flat property name → raw value mapping decoded from one poll response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatus {
    values: HashMap<String, String>,
}

impl RawStatus {
    /// Parse a status document.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Parse` if the body is empty, is not well-formed
    /// XML, or has a root element other than `<properties>` (an HTML login
    /// page served with 200, for instance).
    pub fn from_xml(xml: &str) -> Result<Self> {
        let trimmed = xml.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Err(ClientError::Parse("empty status body".to_string()));
        }
        if !trimmed.starts_with('<') {
            return Err(ClientError::Parse("status body is not XML".to_string()));
        }

        let root = root_element(trimmed)?;
        if root != ROOT_ELEMENT {
            return Err(ClientError::Parse(format!(
                "Expected <{}> status document, got <{}>",
                ROOT_ELEMENT, root
            )));
        }

        let list: PropertyList = quick_xml::de::from_str(trimmed)
            .map_err(|e| ClientError::Parse(format!("Failed to parse status XML: {}", e)))?;

        Ok(list
            .properties
            .into_iter()
            .map(|property| (property.name, property.value))
            .collect())
    }

    /// Raw value of a property, if the device reported it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Insert or overwrite a property value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of properties reported.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the device reported no properties at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Name of the first element in the document.
fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(ClientError::Parse("status body has no root element".to_string()));
            }
            Ok(_) => {}
            Err(e) => return Err(ClientError::Parse(format!("Failed to parse status XML: {}", e))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawStatus {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<properties>
    <property name="audioDetected" value="no"/>
    <property name="motionDetected" value="yes"/>
    <property name="audioLevel" value="0.0831"/>
    <property name="motionLevel" value="0.4567"/>
    <property name="state" value="idle"/>
</properties>"#;

    #[test]
    fn test_parse_status() {
        let status = RawStatus::from_xml(STATUS_XML).unwrap();

        assert_eq!(status.len(), 5);
        assert_eq!(status.get("audioDetected"), Some("no"));
        assert_eq!(status.get("motionDetected"), Some("yes"));
        assert_eq!(status.get("motionLevel"), Some("0.4567"));
        assert_eq!(status.get("state"), Some("idle"));
        assert_eq!(status.get("battery"), None);
    }

    #[test]
    fn test_parse_empty_property_list() {
        let status = RawStatus::from_xml("<properties></properties>").unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn test_property_without_value_is_empty_string() {
        let status = RawStatus::from_xml(r#"<properties><property name="state"/></properties>"#).unwrap();
        assert_eq!(status.get("state"), Some(""));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let xml = r#"<properties>
            <property name="state" value="idle"/>
            <property name="state" value="recording"/>
        </properties>"#;
        let status = RawStatus::from_xml(xml).unwrap();
        assert_eq!(status.get("state"), Some("recording"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(RawStatus::from_xml(""), Err(ClientError::Parse(_))));
        assert!(matches!(RawStatus::from_xml("   \n"), Err(ClientError::Parse(_))));
        assert!(matches!(
            RawStatus::from_xml("{\"state\": \"idle\"}"),
            Err(ClientError::Parse(_))
        ));
        assert!(matches!(
            RawStatus::from_xml(r#"<properties><property name="state" value="idle"/>"#),
            Err(ClientError::Parse(_))
        ));
        assert!(matches!(
            RawStatus::from_xml(r#"<properties><property value="idle"/></properties>"#),
            Err(ClientError::Parse(_))
        ));
    }

    #[test]
    fn test_self_closing_root_is_empty_list() {
        let status = RawStatus::from_xml("<properties/>").unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn test_rejects_other_documents() {
        let documents = [
            "<html><body><p>Login required</p></body></html>",
            "<!DOCTYPE html>\n<html><head><title>401</title></head></html>",
            "<status><state>idle</state></status>",
            r#"<?xml version="1.0"?><property name="state" value="idle"/>"#,
            "<!-- nothing here -->",
        ];

        for xml in documents {
            assert!(
                matches!(RawStatus::from_xml(xml), Err(ClientError::Parse(_))),
                "accepted {:?}",
                xml
            );
        }
    }

    #[test]
    fn test_from_iterator() {
        let status: RawStatus = [("state", "idle"), ("motionDetected", "no")].into_iter().collect();
        assert_eq!(status.get("state"), Some("idle"));
        assert_eq!(status.iter().count(), 2);
    }
}
