//! CAS v3 validation response parsing.
//!
//! The XML body is first normalised into a JSON-like tree: tag names are
//! lower-cased with namespace prefixes stripped, text and attribute values are
//! whitespace-normalised, an element seen once stays a scalar and repeated
//! siblings become an array. XML attributes live under `"$"` and text mixed
//! with child elements under `"_"`.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use serde_json::{Map, Value};

/// Attributes released by the CAS server for the authenticated user.
pub type Attributes = Map<String, Value>;

const ATTRS_KEY: &str = "$";
const TEXT_KEY: &str = "_";

/// Profile extracted from a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CasProfile {
    pub user: String,
    pub attributes: Attributes,
}

/// Details of an `authenticationFailure` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationFailure {
    /// Error code from the `code` attribute (e.g. `INVALID_TICKET`).
    pub code: Option<String>,
    /// Human readable description from the element text.
    pub description: Option<String>,
}

/// Parsed `serviceResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    Success(CasProfile),
    Failure(AuthenticationFailure),
    /// Neither a success nor a failure branch was present.
    Malformed,
}

impl ServiceResponse {
    /// Parse a validation response body.
    ///
    /// Fails when the body is not XML or has no `serviceResponse` root.
    pub fn parse(body: &str) -> Result<Self> {
        let document = parse_document(body)?;
        let root = document
            .get("serviceresponse")
            .ok_or_else(|| anyhow!("Missing serviceResponse root element"))?;
        Self::from_root(root)
    }

    fn from_root(root: &Value) -> Result<Self> {
        let Some(root) = root.as_object() else {
            return Ok(ServiceResponse::Malformed);
        };

        if let Some(failure) = root.get("authenticationfailure") {
            let code = failure
                .get(ATTRS_KEY)
                .and_then(|attrs| attrs.get("code"))
                .and_then(Value::as_str)
                .map(String::from);
            let description = text_of(failure).filter(|text| !text.is_empty());
            return Ok(ServiceResponse::Failure(AuthenticationFailure {
                code,
                description,
            }));
        }

        if let Some(success) = root.get("authenticationsuccess") {
            let user = success
                .get("user")
                .and_then(text_of)
                .filter(|user| !user.is_empty())
                .ok_or_else(|| anyhow!("authenticationSuccess without user"))?;
            let attributes = success
                .get("attributes")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            return Ok(ServiceResponse::Success(CasProfile { user, attributes }));
        }

        Ok(ServiceResponse::Malformed)
    }
}

/// Text content of a normalised element.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(TEXT_KEY).and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Element under construction while reading.
struct Frame {
    name: String,
    attrs: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase();

        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr.context("Malformed XML attribute")?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().context("Malformed XML attribute value")?;
            attrs.insert(key, Value::String(normalize_text(&value)));
        }

        Ok(Self {
            name,
            attrs,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn push_text(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    fn into_value(self) -> (String, Value) {
        let text = normalize_text(&self.text);

        if self.attrs.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(text));
        }

        let mut map = Map::new();
        if !self.attrs.is_empty() {
            map.insert(ATTRS_KEY.to_string(), Value::Object(self.attrs));
        }
        if !text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        for (key, value) in self.children {
            map.insert(key, value);
        }
        (self.name, Value::Object(map))
    }
}

/// Insert a child, turning repeated siblings into an array.
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an XML document into a single-entry map keyed by the root tag.
pub fn parse_document(xml: &str) -> Result<Map<String, Value>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().context("Malformed XML")?;
        let closed = match event {
            Event::Start(ref start) => {
                stack.push(Frame::open(start)?);
                None
            }
            Event::Empty(ref start) => Some(Frame::open(start)?),
            Event::End(_) => Some(stack.pop().ok_or_else(|| anyhow!("Unbalanced closing tag"))?),
            Event::Text(ref text) => {
                let text = text.unescape().context("Malformed XML text")?;
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(&text);
                }
                None
            }
            Event::CData(ref data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(&String::from_utf8_lossy(data));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(frame) = closed {
            let (name, value) = frame.into_value();
            match stack.last_mut() {
                Some(parent) => insert_child(&mut parent.children, name, value),
                None if document.is_none() => document = Some((name, value)),
                None => return Err(anyhow!("Multiple root elements")),
            }
        }
    }

    if !stack.is_empty() {
        return Err(anyhow!("Unexpected end of document"));
    }

    let (name, value) = document.ok_or_else(|| anyhow!("Empty XML document"))?;
    let mut map = Map::new();
    map.insert(name, value);
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SUCCESS: &str = r#"
        <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
            <cas:authenticationSuccess>
                <cas:user>alice</cas:user>
                <cas:attributes>
                    <cas:email>a@x.com</cas:email>
                </cas:attributes>
            </cas:authenticationSuccess>
        </cas:serviceResponse>
    "#;

    #[test]
    fn test_parse_success() {
        let response = ServiceResponse::parse(SUCCESS).unwrap();
        assert_eq!(
            response,
            ServiceResponse::Success(CasProfile {
                user: "alice".to_string(),
                attributes: json!({"email": "a@x.com"}).as_object().unwrap().clone(),
            })
        );
    }

    #[test]
    fn test_parse_failure_with_code() {
        let xml = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
            <cas:authenticationFailure code="INVALID_TICKET">
                Ticket   ST-1856339 not recognized
            </cas:authenticationFailure>
        </cas:serviceResponse>"#;

        match ServiceResponse::parse(xml).unwrap() {
            ServiceResponse::Failure(failure) => {
                assert_eq!(failure.code.as_deref(), Some("INVALID_TICKET"));
                assert_eq!(
                    failure.description.as_deref(),
                    Some("Ticket ST-1856339 not recognized")
                );
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_parse_failure_without_code() {
        let xml = "<serviceResponse><authenticationFailure/></serviceResponse>";
        assert_eq!(
            ServiceResponse::parse(xml).unwrap(),
            ServiceResponse::Failure(AuthenticationFailure::default())
        );
    }

    #[test]
    fn test_tag_names_case_and_prefix_normalized() {
        let xml = "<CAS:SERVICERESPONSE xmlns:CAS=\"urn:x\">\
                   <AUTHENTICATIONSUCCESS><User>bob</User></AUTHENTICATIONSUCCESS>\
                   </CAS:SERVICERESPONSE>";
        match ServiceResponse::parse(xml).unwrap() {
            ServiceResponse::Success(profile) => {
                assert_eq!(profile.user, "bob");
                assert!(profile.attributes.is_empty());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_neither_branch_is_malformed() {
        let xml = "<cas:serviceResponse xmlns:cas=\"urn:x\"><cas:proxySuccess/></cas:serviceResponse>";
        assert_eq!(ServiceResponse::parse(xml).unwrap(), ServiceResponse::Malformed);

        let empty = "<cas:serviceResponse xmlns:cas=\"urn:x\"/>";
        assert_eq!(ServiceResponse::parse(empty).unwrap(), ServiceResponse::Malformed);
    }

    #[test]
    fn test_missing_root_is_error() {
        assert!(ServiceResponse::parse("<html><body>oops</body></html>").is_err());
        assert!(ServiceResponse::parse("not xml at all").is_err());
        assert!(ServiceResponse::parse("").is_err());
    }

    #[test]
    fn test_unbalanced_xml_is_error() {
        assert!(ServiceResponse::parse("<serviceResponse><authenticationSuccess>").is_err());
        assert!(ServiceResponse::parse("<serviceResponse></other>").is_err());
    }

    #[test]
    fn test_success_without_user_is_error() {
        let xml = "<serviceResponse><authenticationSuccess><attributes/></authenticationSuccess></serviceResponse>";
        assert!(ServiceResponse::parse(xml).is_err());
    }

    #[test]
    fn test_repeated_attributes_become_array() {
        let xml = r#"<cas:serviceResponse xmlns:cas="urn:x">
            <cas:authenticationSuccess>
                <cas:user>carol</cas:user>
                <cas:attributes>
                    <cas:memberOf>staff</cas:memberOf>
                    <cas:memberOf>admins</cas:memberOf>
                    <cas:displayName>Carol   Doe</cas:displayName>
                </cas:attributes>
            </cas:authenticationSuccess>
        </cas:serviceResponse>"#;

        match ServiceResponse::parse(xml).unwrap() {
            ServiceResponse::Success(profile) => {
                assert_eq!(profile.attributes["memberof"], json!(["staff", "admins"]));
                assert_eq!(profile.attributes["displayname"], json!("Carol Doe"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_document_keeps_attributes_and_mixed_text() {
        let document = parse_document(r#"<a x=" 1 "><b>t</b>hello<c/></a>"#).unwrap();
        assert_eq!(
            Value::Object(document),
            json!({"a": {"$": {"x": "1"}, "_": "hello", "b": "t", "c": ""}})
        );
    }

    #[test]
    fn test_cdata_and_entities() {
        let document = parse_document("<user><![CDATA[d&d]]></user>").unwrap();
        assert_eq!(document["user"], json!("d&d"));

        let document = parse_document("<user>a &amp; b</user>").unwrap();
        assert_eq!(document["user"], json!("a & b"));
    }
}
