//! Per-coin graph-pattern fragments.
//!
//! [`coin_fragment`] turns one coin description into a self-contained pattern
//! group: record-type binding, identifier, the optional descriptive bindings
//! (mint, weight, date, diameter, descriptions, thumbnails, type-series
//! cross-reference), the per-side triple match and the keyword filters.
//!
//! Variable discipline: the shared result columns (`?url`, `?weight`, …) and
//! the per-side anchors (`?obverseSide`, `?obverseIconography`) are
//! deliberately common across fragments — under conjunction they must join on
//! the same record. Everything specific to one coin's match (the reified
//! appearance statement and class-instance variables) carries the coin index,
//! and negated branches additionally carry a `Neg` suffix so the positive and
//! negative paths never share a namespace.

use nummograph_dsl::sparql::{Expr, Pattern, Projection, SelectQuery, Term};

use crate::coin::{CoinSpec, Keyword, RecordKind, Side, SideSpec, TripleElement};

fn triple(subject: Term, predicate: &str, object: Term) -> Pattern {
    Pattern::triple(subject, Term::prefixed(predicate), object)
}

fn var(name: impl Into<String>) -> Term {
    Term::var(name)
}

/// Build the pattern fragment for one coin.
///
/// `index` is the 1-based placeholder index; `negated` is the placeholder's
/// negation verdict from the boolean term.
pub fn coin_fragment(
    index: usize,
    coin: &CoinSpec,
    kind: RecordKind,
    negated: bool,
) -> Vec<Pattern> {
    let mut patterns = vec![
        triple(
            var("url"),
            "rdf:type",
            Term::prefixed(format!("nmo:{}", kind.type_name())),
        ),
        triple(var("url"), "dcterms:identifier", var("id")),
        Pattern::Optional(vec![triple(var("url"), "nmo:hasMint", var("mint"))]),
    ];

    if coin.obverse.has_triple() {
        patterns.extend(side_match(index, Side::Obverse, &coin.obverse, negated));
    }
    if coin.reverse.has_triple() {
        patterns.extend(side_match(index, Side::Reverse, &coin.reverse, negated));
    }

    patterns.extend(thumbnail_patterns(kind));
    patterns.push(description_part(Side::Obverse));
    patterns.push(description_part(Side::Reverse));
    patterns.push(Pattern::Optional(vec![triple(
        var("url"),
        "nmo:hasWeight",
        var("weight"),
    )]));
    patterns.push(Pattern::Optional(vec![
        triple(var("url"), "nmo:hasDate", var("date")),
        Pattern::Filter(Expr::Eq(
            Box::new(Expr::Lang(Box::new(Expr::var("date")))),
            Box::new(Expr::literal("en")),
        )),
    ]));
    patterns.push(Pattern::Optional(vec![triple(
        var("url"),
        "nmo:hasMaxDiameter",
        var("maxDiameter"),
    )]));
    patterns.push(Pattern::Optional(vec![triple(
        var("url"),
        "nmo:hasTypeSeriesItem",
        var("type"),
    )]));

    patterns.extend(keyword_patterns(Side::Obverse, &coin.obverse.keywords));
    patterns.extend(keyword_patterns(Side::Reverse, &coin.reverse.keywords));

    patterns
}

fn side_match(index: usize, side: Side, spec: &SideSpec, negated: bool) -> Vec<Pattern> {
    let subject = spec.subject();
    let predicate = spec.predicate();
    let object = spec.object();

    match (subject, predicate, object) {
        // Single-entity style: a bare subject is matched against the side's
        // flattened appearance list, a much cheaper existential check than the
        // full reified relation.
        (Some(subject), None, None) => appearance_match(index, side, subject, negated),
        _ => relation_match(index, side, subject, predicate, object, negated),
    }
}

fn appearance_match(
    index: usize,
    side: Side,
    subject: &TripleElement,
    negated: bool,
) -> Vec<Pattern> {
    let side_var = format!("{}Side", side.lower());
    let icon_var = format!("{}Iconography", side.lower());
    let list_var = format!("{}Appearance", side.lower());

    let mut out = vec![
        triple(var("url"), side.has_predicate(), var(&side_var)),
        triple(var(&side_var), "nmo:hasIconography", var(&icon_var)),
        triple(var(&icon_var), "nmo:hasAppearance", var(&list_var)),
    ];

    if negated {
        let neg_list = format!("{list_var}{index}Neg");
        let mut inner = vec![triple(var(&icon_var), "nmo:hasAppearance", var(&neg_list))];
        inner.extend(appearance_member(index, side, &neg_list, subject, true));
        out.push(Pattern::FilterNotExists(inner));
    } else {
        out.extend(appearance_member(index, side, &list_var, subject, false));
    }
    out
}

// `rdf:li` membership of the subject in a flattened appearance list; a
// class-flagged subject matches any instance of the class instead.
fn appearance_member(
    index: usize,
    side: Side,
    list_var: &str,
    subject: &TripleElement,
    negated: bool,
) -> Vec<Pattern> {
    if subject.is_class() {
        let instance_var = scoped_var(side, "SubjectInstance", index, negated);
        vec![
            triple(var(list_var), "rdf:li", var(&instance_var)),
            triple(var(&instance_var), "rdf:type", Term::iri(subject.uri())),
        ]
    } else {
        vec![triple(var(list_var), "rdf:li", Term::iri(subject.uri()))]
    }
}

fn relation_match(
    index: usize,
    side: Side,
    subject: Option<&TripleElement>,
    predicate: Option<&TripleElement>,
    object: Option<&TripleElement>,
    negated: bool,
) -> Vec<Pattern> {
    let side_var = format!("{}Side", side.lower());
    let icon_var = format!("{}Iconography", side.lower());
    let bag_var = format!("{}DesignIconography", side.lower());
    let stmt_var = format!("{}Statement{index}", side.lower());

    let mut out = vec![
        triple(var("url"), side.has_predicate(), var(&side_var)),
        triple(var(&side_var), "nmo:hasIconography", var(&icon_var)),
        triple(var(&icon_var), "nmo:hasIconography", var(&bag_var)),
        triple(var(&bag_var), "rdf:type", Term::prefixed("rdf:Bag")),
        triple(var(&bag_var), "rdf:li", var(&stmt_var)),
    ];

    if negated {
        let neg_stmt = format!("{stmt_var}Neg");
        let mut inner = vec![triple(var(&bag_var), "rdf:li", var(&neg_stmt))];
        inner.extend(statement_bindings(
            index, side, &neg_stmt, subject, predicate, object, true,
        ));
        out.push(Pattern::FilterNotExists(inner));
    } else {
        out.extend(statement_bindings(
            index, side, &stmt_var, subject, predicate, object, false,
        ));
    }
    out
}

// Bind the reified appearance statement's subject/predicate/object positions.
fn statement_bindings(
    index: usize,
    side: Side,
    stmt_var: &str,
    subject: Option<&TripleElement>,
    predicate: Option<&TripleElement>,
    object: Option<&TripleElement>,
    negated: bool,
) -> Vec<Pattern> {
    let mut out = Vec::new();
    if let Some(subject) = subject {
        out.extend(position_binding(
            index,
            side,
            stmt_var,
            "rdf:subject",
            "SubjectInstance",
            subject,
            negated,
        ));
    }
    if let Some(predicate) = predicate {
        out.push(triple(
            var(stmt_var),
            "rdf:predicate",
            Term::iri(predicate.uri()),
        ));
    }
    if let Some(object) = object {
        out.extend(position_binding(
            index,
            side,
            stmt_var,
            "rdf:object",
            "ObjectInstance",
            object,
            negated,
        ));
    }
    out
}

fn position_binding(
    index: usize,
    side: Side,
    stmt_var: &str,
    position: &str,
    instance_label: &str,
    element: &TripleElement,
    negated: bool,
) -> Vec<Pattern> {
    if element.is_class() {
        let instance_var = scoped_var(side, instance_label, index, negated);
        vec![
            triple(var(stmt_var), position, var(&instance_var)),
            triple(var(&instance_var), "rdf:type", Term::iri(element.uri())),
        ]
    } else {
        vec![triple(var(stmt_var), position, Term::iri(element.uri()))]
    }
}

fn scoped_var(side: Side, label: &str, index: usize, negated: bool) -> String {
    let suffix = if negated { "Neg" } else { "" };
    format!("{}{label}{index}{suffix}", side.lower())
}

fn description_part(side: Side) -> Pattern {
    let side_var = format!("{}Side", side.lower());
    let desc_var = format!("description{}", side.capitalized());
    Pattern::Optional(vec![
        triple(var("url"), side.has_predicate(), var(&side_var)),
        triple(var(&side_var), "dcterms:description", var(&desc_var)),
        Pattern::Filter(Expr::Eq(
            Box::new(Expr::Lang(Box::new(Expr::var(&desc_var)))),
            Box::new(Expr::literal("en")),
        )),
    ])
}

// Thumbnail bindings differ by record kind: concrete objects link thumbnails
// (directly or via dcterms:relation) on their own sides, while template
// records aggregate one sample thumbnail per side across all objects that
// reference them.
fn thumbnail_patterns(kind: RecordKind) -> Vec<Pattern> {
    match kind {
        RecordKind::NumismaticObject => {
            let mut out = Vec::new();
            for side in [Side::Obverse, Side::Reverse] {
                let side_var = format!("{}Side", side.lower());
                let relation_var = format!("{}Relation", side.lower());
                let thumb_var = format!("thumbnail{}", side.capitalized());
                out.push(Pattern::Optional(vec![
                    triple(var("url"), side.has_predicate(), var(&side_var)),
                    triple(var(&side_var), "dcterms:relation", var(&relation_var)),
                    triple(var(&relation_var), "foaf:thumbnail", var(&thumb_var)),
                ]));
                out.push(Pattern::Optional(vec![
                    triple(var("url"), side.has_predicate(), var(&side_var)),
                    triple(var(&side_var), "foaf:thumbnail", var(&thumb_var)),
                ]));
            }
            out
        }
        RecordKind::TypeSeriesItem => {
            let mut sub_patterns = vec![
                triple(var("referencingObject"), "nmo:hasTypeSeriesItem", var("url")),
                triple(
                    var("referencingObject"),
                    "rdf:type",
                    Term::prefixed("nmo:NumismaticObject"),
                ),
            ];
            for side in [Side::Obverse, Side::Reverse] {
                let side_var = format!("{}ObjSide", side.lower());
                let relation_var = format!("{}ObjRelation", side.lower());
                let thumb_var = format!("{}Thumb", side.lower());
                sub_patterns.push(Pattern::Optional(vec![
                    triple(var("referencingObject"), side.has_predicate(), var(&side_var)),
                    triple(var(&side_var), "dcterms:relation", var(&relation_var)),
                    triple(var(&relation_var), "foaf:thumbnail", var(&thumb_var)),
                ]));
                sub_patterns.push(Pattern::Optional(vec![
                    triple(var("referencingObject"), side.has_predicate(), var(&side_var)),
                    triple(var(&side_var), "foaf:thumbnail", var(&thumb_var)),
                ]));
            }
            vec![Pattern::SubSelect(SelectQuery {
                prefixes: Vec::new(),
                distinct: false,
                projection: vec![
                    Projection::var("url"),
                    Projection::sample("obverseThumb", "thumbnailObverse"),
                    Projection::sample("reverseThumb", "thumbnailReverse"),
                ],
                patterns: sub_patterns,
                group_by: vec!["url".to_string()],
                order_by: None,
                limit: None,
            })]
        }
    }
}

fn keyword_patterns(side: Side, keywords: &[Keyword]) -> Vec<Pattern> {
    let side_var = format!("{}Side", side.lower());
    let icon_var = format!("{}Iconography", side.lower());
    let desc_var = format!("{}Desc", side.lower());

    let mut out = Vec::new();
    for keyword in keywords {
        if keyword.negated {
            out.push(Pattern::FilterNotExists(vec![
                triple(var("url"), side.has_predicate(), var(&side_var)),
                triple(var(&side_var), "nmo:hasIconography", var(&icon_var)),
                triple(
                    var(&icon_var),
                    "dcterms:description",
                    var(format!("{desc_var}Neg")),
                ),
                Pattern::Filter(Expr::Regex(
                    Box::new(Expr::var(format!("{desc_var}Neg"))),
                    keyword.text.clone(),
                    Some("i".to_string()),
                )),
            ]));
        } else {
            out.push(triple(var("url"), side.has_predicate(), var(&side_var)));
            out.push(triple(var(&side_var), "nmo:hasIconography", var(&icon_var)));
            out.push(triple(var(&icon_var), "dcterms:description", var(&desc_var)));
            out.push(Pattern::Filter(Expr::Regex(
                Box::new(Expr::var(&desc_var)),
                keyword.text.clone(),
                None,
            )));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::{ElementRole, EntityRef};

    fn element(role: ElementRole, uri: &str, category: Option<&str>) -> TripleElement {
        TripleElement {
            role,
            item: EntityRef {
                link: uri.to_string(),
            },
            category: category.map(str::to_string),
        }
    }

    fn render(patterns: &[Pattern]) -> String {
        SelectQuery::new(vec![Projection::var("url")], patterns.to_vec()).render()
    }

    #[test]
    fn bare_subject_uses_flattened_appearance_check() {
        let mut coin = CoinSpec::default();
        coin.obverse.triple = vec![element(
            ElementRole::Subj,
            "http://example.org/id/artemis",
            None,
        )];
        let text = render(&coin_fragment(1, &coin, RecordKind::NumismaticObject, false));
        assert!(text.contains("?obverseIconography nmo:hasAppearance ?obverseAppearance ."));
        assert!(text.contains("?obverseAppearance rdf:li <http://example.org/id/artemis> ."));
        // No reified relation match for a bare subject.
        assert!(!text.contains("rdf:subject"));
        assert!(!text.contains("rdf:Bag"));
    }

    #[test]
    fn full_triple_uses_reified_relation_match() {
        let mut coin = CoinSpec::default();
        coin.obverse.triple = vec![
            element(ElementRole::Subj, "http://example.org/id/artemis", None),
            element(ElementRole::Predicate, "http://example.org/id/holding", None),
            element(ElementRole::Obj, "http://example.org/id/bow", None),
        ];
        let text = render(&coin_fragment(2, &coin, RecordKind::NumismaticObject, false));
        assert!(text.contains("?obverseDesignIconography rdf:type rdf:Bag ."));
        assert!(text.contains("?obverseDesignIconography rdf:li ?obverseStatement2 ."));
        assert!(text.contains("?obverseStatement2 rdf:subject <http://example.org/id/artemis> ."));
        assert!(text.contains("?obverseStatement2 rdf:predicate <http://example.org/id/holding> ."));
        assert!(text.contains("?obverseStatement2 rdf:object <http://example.org/id/bow> ."));
    }

    #[test]
    fn class_flagged_positions_match_instances() {
        let mut coin = CoinSpec::default();
        coin.reverse.triple = vec![
            element(
                ElementRole::Subj,
                "http://example.org/id/deities",
                Some("list_class"),
            ),
            element(ElementRole::Obj, "http://example.org/id/object", Some("list_class")),
        ];
        let text = render(&coin_fragment(1, &coin, RecordKind::NumismaticObject, false));
        assert!(text.contains("?reverseStatement1 rdf:subject ?reverseSubjectInstance1 ."));
        assert!(text.contains("?reverseSubjectInstance1 rdf:type <http://example.org/id/deities> ."));
        assert!(text.contains("?reverseStatement1 rdf:object ?reverseObjectInstance1 ."));
        assert!(text.contains("?reverseObjectInstance1 rdf:type <http://example.org/id/object> ."));
    }

    #[test]
    fn negated_match_uses_independent_namespace() {
        let mut coin = CoinSpec::default();
        coin.obverse.triple = vec![
            element(ElementRole::Subj, "http://example.org/id/artemis", None),
            element(ElementRole::Predicate, "http://example.org/id/holding", None),
        ];
        let text = render(&coin_fragment(3, &coin, RecordKind::NumismaticObject, true));
        assert!(text.contains("FILTER NOT EXISTS {"));
        assert!(text.contains("?obverseDesignIconography rdf:li ?obverseStatement3Neg ."));
        assert!(text.contains("?obverseStatement3Neg rdf:subject <http://example.org/id/artemis> ."));
        // The positive anchor line is still present outside the negation.
        assert!(text.contains("?obverseDesignIconography rdf:li ?obverseStatement3 ."));
    }

    #[test]
    fn keywords_conjoin_and_negated_keywords_exclude() {
        let mut coin = CoinSpec::default();
        coin.obverse.keywords = vec![
            Keyword {
                text: "bow".to_string(),
                negated: false,
            },
            Keyword {
                text: "serpent".to_string(),
                negated: true,
            },
        ];
        let text = render(&coin_fragment(1, &coin, RecordKind::NumismaticObject, false));
        assert!(text.contains("FILTER(regex(?obverseDesc, \"bow\"))"));
        assert!(text.contains("FILTER NOT EXISTS {"));
        assert!(text.contains("FILTER(regex(?obverseDescNeg, \"serpent\", \"i\"))"));
    }

    #[test]
    fn template_records_aggregate_thumbnails() {
        let coin = CoinSpec::default();
        let text = render(&coin_fragment(1, &coin, RecordKind::TypeSeriesItem, false));
        assert!(text.contains("?url rdf:type nmo:TypeSeriesItem ."));
        assert!(text.contains("SELECT ?url (SAMPLE(?obverseThumb) AS ?thumbnailObverse) (SAMPLE(?reverseThumb) AS ?thumbnailReverse) WHERE {"));
        assert!(text.contains("} GROUP BY ?url"));
        assert!(text.contains("?referencingObject nmo:hasTypeSeriesItem ?url ."));
    }

    #[test]
    fn concrete_records_bind_both_thumbnail_paths() {
        let coin = CoinSpec::default();
        let text = render(&coin_fragment(1, &coin, RecordKind::NumismaticObject, false));
        assert!(text.contains("?obverseRelation foaf:thumbnail ?thumbnailObverse ."));
        assert!(text.contains("?obverseSide foaf:thumbnail ?thumbnailObverse ."));
        assert!(text.contains("?reverseSide foaf:thumbnail ?thumbnailReverse ."));
    }
}
