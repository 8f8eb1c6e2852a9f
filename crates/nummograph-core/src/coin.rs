//! Wire types for coin descriptions and search parameters.
//!
//! The shapes mirror the JSON the tag-builder UI submits: one entry per coin,
//! each with an obverse and reverse side holding up to one
//! subject/predicate/object triple plus keyword filters. These are ephemeral —
//! built per request, consumed once by the compiler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One coin description: both sides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinSpec {
    #[serde(default)]
    pub obverse: SideSpec,
    #[serde(default)]
    pub reverse: SideSpec,
}

/// One side of a coin description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideSpec {
    /// Triple elements tagged with their role; the UI sends 0–3 of them.
    #[serde(default, alias = "coin")]
    pub triple: Vec<TripleElement>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl SideSpec {
    pub fn has_triple(&self) -> bool {
        !self.triple.is_empty()
    }

    pub fn subject(&self) -> Option<&TripleElement> {
        self.element(ElementRole::Subj)
    }

    pub fn predicate(&self) -> Option<&TripleElement> {
        self.element(ElementRole::Predicate)
    }

    pub fn object(&self) -> Option<&TripleElement> {
        self.element(ElementRole::Obj)
    }

    fn element(&self, role: ElementRole) -> Option<&TripleElement> {
        self.triple.iter().find(|e| e.role == role)
    }
}

/// A bound subject, predicate or object on one coin side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleElement {
    #[serde(rename = "type")]
    pub role: ElementRole,
    pub item: EntityRef,
    /// UI category tag of the picked entity. `list_class` means the URI
    /// denotes a class whose *instances* must be matched, not the URI
    /// literally.
    #[serde(default)]
    pub category: Option<String>,
}

impl TripleElement {
    pub fn uri(&self) -> &str {
        &self.item.link
    }

    pub fn is_class(&self) -> bool {
        self.category.as_deref() == Some("list_class")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementRole {
    Subj,
    Predicate,
    Obj,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub link: String,
}

/// Free-text keyword filter on one side's iconography description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    #[serde(default)]
    pub negated: bool,
}

/// Concrete numismatic object vs. type-series template record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    NumismaticObject,
    TypeSeriesItem,
}

impl RecordKind {
    /// Local name inside the `nmo:` namespace.
    pub fn type_name(self) -> &'static str {
        match self {
            RecordKind::NumismaticObject => "NumismaticObject",
            RecordKind::TypeSeriesItem => "TypeSeriesItem",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NumismaticObject" => Ok(RecordKind::NumismaticObject),
            "TypeSeriesItem" => Ok(RecordKind::TypeSeriesItem),
            other => Err(format!(
                "unknown record kind `{other}` (expected NumismaticObject|TypeSeriesItem)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Obverse,
    Reverse,
}

impl Side {
    /// Lowercase form used in variable names (`obverse`).
    pub fn lower(self) -> &'static str {
        match self {
            Side::Obverse => "obverse",
            Side::Reverse => "reverse",
        }
    }

    /// Capitalized form used in column names (`Obverse`).
    pub fn capitalized(self) -> &'static str {
        match self {
            Side::Obverse => "Obverse",
            Side::Reverse => "Reverse",
        }
    }

    /// The `nmo:` link predicate from a record to this side.
    pub fn has_predicate(self) -> &'static str {
        match self {
            Side::Obverse => "nmo:hasObverse",
            Side::Reverse => "nmo:hasReverse",
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "obverse" => Ok(Side::Obverse),
            "reverse" => Ok(Side::Reverse),
            other => Err(format!("unknown coin side `{other}` (expected obverse|reverse)")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lower())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ui_payload() {
        let json = r#"{
            "obverse": {
                "coin": [
                    {"type": "Subj", "item": {"link": "http://example.org/id/artemis"}, "category": "list_person"},
                    {"type": "Predicate", "item": {"link": "http://example.org/id/holding"}},
                    {"type": "Obj", "item": {"link": "http://example.org/id/object"}, "category": "list_class"}
                ],
                "keywords": [{"text": "bow", "negated": false}]
            },
            "reverse": {"coin": [], "keywords": []}
        }"#;
        let coin: CoinSpec = serde_json::from_str(json).unwrap();
        let subject = coin.obverse.subject().unwrap();
        assert_eq!(subject.uri(), "http://example.org/id/artemis");
        assert!(!subject.is_class());
        assert!(coin.obverse.object().unwrap().is_class());
        assert!(coin.obverse.predicate().is_some());
        assert!(!coin.reverse.has_triple());
    }

    #[test]
    fn side_and_kind_parse_from_wire_strings() {
        assert_eq!("obverse".parse::<Side>().unwrap(), Side::Obverse);
        assert_eq!(
            "TypeSeriesItem".parse::<RecordKind>().unwrap(),
            RecordKind::TypeSeriesItem
        );
        assert!("edge".parse::<Side>().is_err());
    }
}
