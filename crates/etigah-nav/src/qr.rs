//! QR locator codec: node identity triples to marker text and back.
//!
//! Two wire forms decode to the same [`QrPayload`]:
//!
//! ```text
//! {"n":"node-7","b":"BLDG_A","f":2}
//! direction://node?nodeId=node-7&building=BLDG_A&floor=2
//! ```
//!
//! The JSON form is what [`encode`] produces and what printed markers carry.
//! The URI form is accepted for markers generated by other tools; its
//! `floor` parameter is lenient and falls back to 1.
//!
//! Decoding never fails loudly: unreadable text yields
//! [`Decoded::Invalid`] with the reason, or `None` from [`decode`].

use crate::graph::{FloorGraph, Level, Node, NodeId};
use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;
use url::{form_urlencoded, Url};

/// URI scheme of the URI wire form.
pub const DEFAULT_SCHEME: &str = "direction";

/// Host written by [`QrCodec::encode_uri`]. Ignored when decoding.
pub const URI_HOST: &str = "node";

/// Floor assumed when a URI marker omits it or carries garbage.
pub const DEFAULT_FLOOR: u32 = 1;

/// Identity triple carried by a physical marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QrPayload {
    node_id: NodeId,
    building: String,
    floor: u32,
}

impl QrPayload {
    /// Build a payload, rejecting empty identifiers and floor 0.
    pub fn new(
        node_id: impl Into<NodeId>,
        building: impl Into<String>,
        floor: u32,
    ) -> Result<Self, DecodeFailure> {
        let node_id = node_id.into();
        let building = building.into();
        if node_id.is_empty() {
            return Err(DecodeFailure::EmptyField("node id"));
        }
        if building.is_empty() {
            return Err(DecodeFailure::EmptyField("building"));
        }
        if floor == 0 {
            return Err(DecodeFailure::InvalidFloor);
        }
        Ok(Self {
            node_id,
            building,
            floor,
        })
    }

    /// Payload identifying a stored node.
    pub fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            building: node.building.clone(),
            floor: node.floor,
        }
    }

    /// Identity of the marked node.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Building the marker is in.
    pub fn building(&self) -> &str {
        &self.building
    }

    /// Floor the marker is on.
    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// The `(building, floor)` pair.
    pub fn level(&self) -> Level {
        Level::new(self.building.clone(), self.floor)
    }
}

/// Why a piece of scanned text is not a marker payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    /// Nothing but whitespace
    #[error("empty text")]
    Empty,
    /// Neither the URI nor the JSON form
    #[error("not a marker payload")]
    Unrecognized,
    /// Starts with the marker scheme but is not a valid URI
    #[error("malformed marker URI: {0}")]
    MalformedUri(String),
    /// Starts with `{` but is not a JSON object
    #[error("malformed marker JSON: {0}")]
    MalformedJson(String),
    /// A required field is absent
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field has the wrong JSON type
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
    /// A required string field is empty
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),
    /// Floor is zero, negative, fractional or out of range
    #[error("floor must be a whole number >= 1")]
    InvalidFloor,
}

/// Result of decoding scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The text identifies a node
    Valid(QrPayload),
    /// The text is not a usable marker
    Invalid(DecodeFailure),
}

impl Decoded {
    /// The payload, if valid.
    pub fn into_option(self) -> Option<QrPayload> {
        match self {
            Decoded::Valid(payload) => Some(payload),
            Decoded::Invalid(_) => None,
        }
    }

    /// Whether the text decoded to a payload.
    pub fn is_valid(&self) -> bool {
        matches!(self, Decoded::Valid(_))
    }
}

impl From<Result<QrPayload, DecodeFailure>> for Decoded {
    fn from(result: Result<QrPayload, DecodeFailure>) -> Self {
        match result {
            Ok(payload) => Decoded::Valid(payload),
            Err(failure) => Decoded::Invalid(failure),
        }
    }
}

#[derive(Serialize)]
struct WirePayload<'a> {
    n: &'a str,
    b: &'a str,
    f: u32,
}

/// Marker codec bound to a URI scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodec {
    scheme: String,
}

impl Default for QrCodec {
    fn default() -> Self {
        Self::with_scheme(DEFAULT_SCHEME)
    }
}

impl QrCodec {
    /// Codec recognising `<scheme>://` markers.
    pub fn with_scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    /// The recognised URI scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Decode scanned text, keeping the failure reason.
    pub fn parse(&self, text: &str) -> Decoded {
        let text = text.trim();
        let result = if text.is_empty() {
            Err(DecodeFailure::Empty)
        } else if self.has_scheme_prefix(text) {
            parse_uri(text)
        } else if text.starts_with('{') {
            parse_json(text)
        } else {
            Err(DecodeFailure::Unrecognized)
        };

        match &result {
            Ok(payload) => trace!("Decoded marker for node {}", payload.node_id),
            Err(failure) => debug!("Rejected scanned text: {failure}"),
        }
        result.into()
    }

    /// Decode scanned text; `None` for anything that is not a marker.
    pub fn decode(&self, text: &str) -> Option<QrPayload> {
        self.parse(text).into_option()
    }

    /// Canonical JSON form: `{"n":…,"b":…,"f":…}`.
    pub fn encode(&self, payload: &QrPayload) -> String {
        let wire = WirePayload {
            n: payload.node_id.as_str(),
            b: &payload.building,
            f: payload.floor,
        };
        // Plain strings and an integer always serialize
        serde_json::to_string(&wire).expect("Failed to serialize marker payload")
    }

    /// URI form: `<scheme>://node?nodeId=…&building=…&floor=…`.
    pub fn encode_uri(&self, payload: &QrPayload) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("nodeId", payload.node_id.as_str())
            .append_pair("building", &payload.building)
            .append_pair("floor", &payload.floor.to_string())
            .finish();
        format!("{}://{URI_HOST}?{query}", self.scheme)
    }

    fn has_scheme_prefix(&self, text: &str) -> bool {
        let prefix = format!("{}://", self.scheme);
        text.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
    }
}

fn parse_uri(text: &str) -> Result<QrPayload, DecodeFailure> {
    let url = Url::parse(text).map_err(|e| DecodeFailure::MalformedUri(e.to_string()))?;

    let mut node_id = None;
    let mut building = None;
    let mut floor = None;
    // First occurrence of each parameter wins
    for (key, value) in url.query_pairs() {
        let slot = match &*key {
            "nodeId" => &mut node_id,
            "building" => &mut building,
            "floor" => &mut floor,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let node_id = node_id.ok_or(DecodeFailure::MissingField("nodeId"))?;
    let building = building.ok_or(DecodeFailure::MissingField("building"))?;
    let floor = floor
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|floor| *floor >= 1)
        .unwrap_or(DEFAULT_FLOOR);

    QrPayload::new(node_id, building, floor)
}

fn parse_json(text: &str) -> Result<QrPayload, DecodeFailure> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeFailure::MalformedJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| DecodeFailure::MalformedJson("not an object".to_string()))?;

    let string_field = |key: &'static str| -> Result<String, DecodeFailure> {
        match object.get(key) {
            None => Err(DecodeFailure::MissingField(key)),
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(DecodeFailure::WrongType(key)),
        }
    };
    let node_id = string_field("n")?;
    let building = string_field("b")?;
    let floor = match object.get("f") {
        None => return Err(DecodeFailure::MissingField("f")),
        Some(serde_json::Value::Number(number)) => json_floor(number)?,
        Some(_) => return Err(DecodeFailure::WrongType("f")),
    };

    QrPayload::new(node_id, building, floor)
}

fn json_floor(number: &serde_json::Number) -> Result<u32, DecodeFailure> {
    let whole = match number.as_u64() {
        Some(n) => n,
        // Accept 2.0 but not 2.5 or -1
        None => match number.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => f as u64,
            _ => return Err(DecodeFailure::InvalidFloor),
        },
    };
    u32::try_from(whole).map_err(|_| DecodeFailure::InvalidFloor)
}

/// Decode scanned text with the default `direction` scheme.
pub fn decode(text: &str) -> Option<QrPayload> {
    QrCodec::default().decode(text)
}

/// Encode a payload in the canonical JSON form.
pub fn encode(payload: &QrPayload) -> String {
    QrCodec::default().encode(payload)
}

/// Encode a payload in the URI form with the default scheme.
pub fn encode_uri(payload: &QrPayload) -> String {
    QrCodec::default().encode_uri(payload)
}

/// Marker text for every node of the map, in identity order.
pub fn marker_payloads(graph: &FloorGraph) -> Vec<(NodeId, String)> {
    let codec = QrCodec::default();
    graph
        .nodes()
        .map(|node| (node.id.clone(), codec.encode(&QrPayload::from_node(node))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: &str, b: &str, f: u32) -> QrPayload {
        QrPayload::new(n, b, f).unwrap()
    }

    #[test]
    fn test_encode_is_compact_json_in_key_order() {
        assert_eq!(
            encode(&payload("A", "BLDG", 1)),
            r#"{"n":"A","b":"BLDG","f":1}"#
        );
    }

    #[test]
    fn test_decode_json() {
        assert_eq!(
            decode(r#"{"n":"A","b":"BLDG","f":3}"#),
            Some(payload("A", "BLDG", 3))
        );
        // Integral floats are whole floors
        assert_eq!(
            decode(r#"{"n":"A","b":"BLDG","f":2.0}"#),
            Some(payload("A", "BLDG", 2))
        );
    }

    #[test]
    fn test_decode_json_failures() {
        let codec = QrCodec::default();
        assert_eq!(
            codec.parse(r#"{"b":"BLDG","f":1}"#),
            Decoded::Invalid(DecodeFailure::MissingField("n"))
        );
        assert_eq!(
            codec.parse(r#"{"n":7,"b":"BLDG","f":1}"#),
            Decoded::Invalid(DecodeFailure::WrongType("n"))
        );
        assert_eq!(
            codec.parse(r#"{"n":"A","b":"BLDG","f":"1"}"#),
            Decoded::Invalid(DecodeFailure::WrongType("f"))
        );
        assert_eq!(
            codec.parse(r#"{"n":"A","b":"BLDG","f":0}"#),
            Decoded::Invalid(DecodeFailure::InvalidFloor)
        );
        assert_eq!(
            codec.parse(r#"{"n":"A","b":"BLDG","f":1.5}"#),
            Decoded::Invalid(DecodeFailure::InvalidFloor)
        );
        assert!(matches!(
            codec.parse(r#"{"n":"A","#),
            Decoded::Invalid(DecodeFailure::MalformedJson(_))
        ));
    }

    #[test]
    fn test_decode_uri_with_lenient_floor() {
        assert_eq!(
            decode("direction://node?nodeId=A&building=BLDG&floor=4"),
            Some(payload("A", "BLDG", 4))
        );
        assert_eq!(
            decode("direction://node?nodeId=A&building=BLDG"),
            Some(payload("A", "BLDG", 1))
        );
        assert_eq!(
            decode("direction://node?nodeId=A&building=BLDG&floor=lobby"),
            Some(payload("A", "BLDG", 1))
        );
    }

    #[test]
    fn test_decode_uri_requires_identity() {
        let codec = QrCodec::default();
        assert_eq!(
            codec.parse("direction://node?building=BLDG&floor=2"),
            Decoded::Invalid(DecodeFailure::MissingField("nodeId"))
        );
        assert_eq!(
            codec.parse("direction://node?nodeId=&building=BLDG"),
            Decoded::Invalid(DecodeFailure::EmptyField("node id"))
        );
    }

    #[test]
    fn test_decode_unrecognized_text() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("https://example.com/?nodeId=A"), None);
        assert_eq!(decode("hello"), None);
        assert_eq!(decode("[1,2,3]"), None);
    }

    #[test]
    fn test_uri_round_trip_with_reserved_characters() {
        let tricky = payload("room 1&2", "east/wing", 7);
        let uri = encode_uri(&tricky);
        assert!(uri.starts_with("direction://node?"));
        assert_eq!(decode(&uri), Some(tricky));
    }

    #[test]
    fn test_custom_scheme() {
        let codec = QrCodec::with_scheme("etigah");
        assert!(codec.decode("etigah://node?nodeId=A&building=B").is_some());
        assert!(codec.decode("direction://node?nodeId=A&building=B").is_none());
    }
}
