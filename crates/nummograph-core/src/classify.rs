//! Category classifier for recommendation bucketing.
//!
//! Recommendation rows report the topmost superclass of each candidate; the
//! UI groups candidates into semantic buckets keyed by that URI. The mapping
//! is a pure total function — an unrecognized URI lands in `Unknown`.

use serde::{Deserialize, Serialize};

const ANIMAL_URI: &str = "https://www.wikidata.org/wiki/Q729";
const OBJECT_URI: &str = "https://www.wikidata.org/wiki/Q488383";
const PERSON_URI: &str = "http://xmlns.com/foaf/0.1/#term_Person";
const PLANT_URI: &str = "https://www.wikidata.org/wiki/Q756";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RecommendationCategory {
    #[serde(rename = "list_animal")]
    Animal,
    #[serde(rename = "list_obj")]
    Object,
    #[serde(rename = "list_person")]
    Person,
    #[serde(rename = "list_plant")]
    Plant,
    #[serde(rename = "list_class")]
    Class,
    #[serde(rename = "list_verb")]
    Verb,
    #[serde(rename = "list_unknown")]
    Unknown,
}

impl RecommendationCategory {
    /// The literal bucket tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationCategory::Animal => "list_animal",
            RecommendationCategory::Object => "list_obj",
            RecommendationCategory::Person => "list_person",
            RecommendationCategory::Plant => "list_plant",
            RecommendationCategory::Class => "list_class",
            RecommendationCategory::Verb => "list_verb",
            RecommendationCategory::Unknown => "list_unknown",
        }
    }
}

/// Map a resolved top-level class URI to its semantic bucket.
pub fn category_for_uri(uri: &str) -> RecommendationCategory {
    match uri {
        ANIMAL_URI => RecommendationCategory::Animal,
        OBJECT_URI => RecommendationCategory::Object,
        PERSON_URI => RecommendationCategory::Person,
        PLANT_URI => RecommendationCategory::Plant,
        _ => RecommendationCategory::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_uris_map_to_fixed_buckets() {
        assert_eq!(
            category_for_uri("https://www.wikidata.org/wiki/Q729"),
            RecommendationCategory::Animal
        );
        assert_eq!(
            category_for_uri("https://www.wikidata.org/wiki/Q488383"),
            RecommendationCategory::Object
        );
        assert_eq!(
            category_for_uri("http://xmlns.com/foaf/0.1/#term_Person"),
            RecommendationCategory::Person
        );
        assert_eq!(
            category_for_uri("https://www.wikidata.org/wiki/Q756"),
            RecommendationCategory::Plant
        );
    }

    #[test]
    fn unknown_uri_maps_to_unknown() {
        assert_eq!(
            category_for_uri("http://example.org/id/ship"),
            RecommendationCategory::Unknown
        );
        assert_eq!(category_for_uri(""), RecommendationCategory::Unknown);
    }

    #[test]
    fn wire_tags_are_stable() {
        let json = serde_json::to_string(&RecommendationCategory::Object).unwrap();
        assert_eq!(json, "\"list_obj\"");
    }

    proptest! {
        #[test]
        fn total_on_arbitrary_uris(uri in ".{0,64}") {
            let _ = category_for_uri(&uri);
        }
    }
}
