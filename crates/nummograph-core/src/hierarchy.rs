//! Hierarchy strategy queries.
//!
//! Every recommendation strategy produces one scoped SELECT query with the
//! same overall shape: a candidate-generating pattern, a display-name bind,
//! a prefix filter, and a shared existence filter that keeps only candidates
//! actually occurring on at least one record of the given side and record
//! kind, jointly with whatever the user has already bound.
//!
//! Candidate queries uniformly project `?candidate` and `?candidateName`
//! (plus `?superClass` where the caller buckets by resolved superclass), so
//! result handling does not depend on the strategy.

use nummograph_dsl::sparql::{Expr, Pattern, Projection, SelectQuery, Term};

use crate::coin::{RecordKind, Side};

/// Candidate URI column.
pub const CANDIDATE: &str = "candidate";
/// Candidate display-name column.
pub const CANDIDATE_NAME: &str = "candidateName";
/// Resolved topmost-superclass column (strategies 2, 7 and 8).
pub const SUPER_CLASS: &str = "superClass";

/// Ontology noise class excluded from class-candidate queries.
pub const EXCLUDED_CLASS: &str = "http://www.dbis.cs.uni-frankfurt.de/cnt/id/ocre_object_object";

/// Secondary label tagging ontology predicates.
const PREDICATE_LABEL_TAG: &str = "predicate_id";

const RDF_SCHEMA_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";

/// What the user has bound so far on one coin side, plus the typed prefix.
///
/// One of these exists per recommendation call; empty inbound strings are the
/// sentinel for "unbound" and are converted to `None` at construction.
#[derive(Debug, Clone)]
pub struct TagContext {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    /// Whether the active input is the subject position (else object).
    pub is_subject: bool,
    pub side: Side,
    /// Prefix the candidate display name must start with; empty = no filter.
    pub filter: String,
}

impl TagContext {
    pub fn from_raw(
        subject: &str,
        predicate: &str,
        object: &str,
        is_subject: bool,
        side: Side,
        filter: &str,
    ) -> Self {
        TagContext {
            subject: non_empty(subject),
            predicate: non_empty(predicate),
            object: non_empty(object),
            is_subject,
            side,
            filter: filter.to_string(),
        }
    }

    /// The entity the hierarchy strategies navigate from: the bound subject
    /// or object, depending on `is_subject`.
    pub fn current(&self) -> Option<&str> {
        if self.is_subject {
            self.subject.as_deref()
        } else {
            self.object.as_deref()
        }
    }

    /// Same context with the prefix filter cleared (availability probes).
    pub fn without_filter(&self) -> Self {
        let mut ctx = self.clone();
        ctx.filter.clear();
        ctx
    }

    fn current_iri(&self) -> Term {
        Term::iri(self.current().unwrap_or_default())
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// How a candidate variable occurs in the existence filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateMode {
    /// The candidate itself occupies the triple position (entity candidates).
    Direct,
    /// Some instance of the candidate occupies it (class candidates).
    Instances,
    /// Either of the above (sibling candidates can be classes or instances).
    Either,
}

fn triple(subject: Term, predicate: &str, object: Term) -> Pattern {
    Pattern::triple(subject, Term::prefixed(predicate), object)
}

fn var(name: &str) -> Term {
    Term::var(name)
}

/// `BIND(CONCAT(UCASE(first letter), LCASE(rest)) AS ?out)` over the
/// namespace-stripped local name of a label.
pub(crate) fn display_name_bind(label_var: &str, out_var: &str) -> Pattern {
    let strip = Expr::Replace(
        Box::new(Expr::Str(Box::new(Expr::var(label_var)))),
        "^.*[/_#]".to_string(),
        String::new(),
    );
    Pattern::bind(
        Expr::Concat(vec![
            Expr::Ucase(Box::new(Expr::Substr(Box::new(strip.clone()), 1, Some(1)))),
            Expr::Lcase(Box::new(Expr::Substr(Box::new(strip), 2, None))),
        ]),
        out_var,
    )
}

pub(crate) fn name_prefix_filter(name_var: &str, prefix: &str) -> Pattern {
    Pattern::Filter(Expr::starts_with_ci(
        Expr::Str(Box::new(Expr::var(name_var))),
        Expr::literal(prefix),
    ))
}

// `{ ?coinAppearance <pos> <uri> } UNION { instance of <uri> in <pos> }` —
// a bound position accepts the URI itself or, when it names a class, any of
// its instances.
fn bound_position_union(position: &str, uri: &str, entity_var: &str) -> Pattern {
    Pattern::Union(vec![
        vec![triple(var("coinAppearance"), position, Term::iri(uri))],
        vec![
            triple(var(entity_var), "rdf:type", Term::iri(uri)),
            triple(var("coinAppearance"), position, var(entity_var)),
        ],
    ])
}

// From the appearance statement up to a record of the wanted side and kind.
fn statement_chain(side: Side, kind: RecordKind) -> Vec<Pattern> {
    vec![
        triple(var("coinDesignIconography"), "rdf:li", var("coinAppearance")),
        triple(
            var("coinDesignIconography"),
            "rdf:type",
            Term::prefixed("rdf:Bag"),
        ),
        triple(
            var("coinIconography"),
            "nmo:hasIconography",
            var("coinDesignIconography"),
        ),
        triple(var("coinSide"), "nmo:hasIconography", var("coinIconography")),
        triple(var("coinURI"), side.has_predicate(), var("coinSide")),
        triple(
            var("coinURI"),
            "rdf:type",
            Term::prefixed(format!("nmo:{}", kind.type_name())),
        ),
    ]
}

// From a flattened appearance list up to a record of the wanted side/kind.
fn appearance_chain(side: Side, kind: RecordKind) -> Vec<Pattern> {
    vec![
        triple(
            var("coinIconography"),
            "nmo:hasAppearance",
            var("coinAppearance"),
        ),
        triple(var("coinSide"), "nmo:hasIconography", var("coinIconography")),
        triple(var("coinURI"), side.has_predicate(), var("coinSide")),
        triple(
            var("coinURI"),
            "rdf:type",
            Term::prefixed(format!("nmo:{}", kind.type_name())),
        ),
    ]
}

fn candidate_occurrence(position: &str, candidate_var: &str, mode: CandidateMode) -> Vec<Pattern> {
    let direct = vec![triple(var("coinAppearance"), position, var(candidate_var))];
    let via_instance = vec![
        triple(var("candidateInstance"), "rdf:type", var(candidate_var)),
        triple(var("coinAppearance"), position, var("candidateInstance")),
    ];
    match mode {
        CandidateMode::Direct => direct,
        CandidateMode::Instances => via_instance,
        CandidateMode::Either => vec![Pattern::Union(vec![direct, via_instance])],
    }
}

/// The shared existence filter: the candidate must co-occur, on at least one
/// record of the given side and kind, in the triple position matching
/// `is_subject`, jointly with whatever else is bound. With nothing else
/// bound, the cheaper flattened-appearance check is used instead.
pub(crate) fn occurrence_filter(
    ctx: &TagContext,
    kind: RecordKind,
    candidate_var: &str,
    mode: CandidateMode,
) -> Pattern {
    let (position, others_bound) = if ctx.is_subject {
        (
            "rdf:subject",
            ctx.predicate.is_some() || ctx.object.is_some(),
        )
    } else {
        (
            "rdf:object",
            ctx.subject.is_some() || ctx.predicate.is_some(),
        )
    };

    if !others_bound {
        let mut inner = candidate_occurrence("rdf:li", candidate_var, mode);
        inner.extend(appearance_chain(ctx.side, kind));
        return Pattern::FilterExists(inner);
    }

    let mut inner = candidate_occurrence(position, candidate_var, mode);
    if ctx.is_subject {
        if let Some(predicate) = &ctx.predicate {
            inner.push(triple(
                var("coinAppearance"),
                "rdf:predicate",
                Term::iri(predicate),
            ));
        }
        if let Some(object) = &ctx.object {
            inner.push(bound_position_union("rdf:object", object, "objEntity"));
        }
    } else {
        if let Some(subject) = &ctx.subject {
            inner.push(bound_position_union("rdf:subject", subject, "subjEntity"));
        }
        if let Some(predicate) = &ctx.predicate {
            inner.push(triple(
                var("coinAppearance"),
                "rdf:predicate",
                Term::iri(predicate),
            ));
        }
    }
    inner.extend(statement_chain(ctx.side, kind));
    Pattern::FilterExists(inner)
}

fn minimality_not_exists(lower: Term, upper: Term, via_var: &str) -> Pattern {
    // No intermediate class strictly between `lower` and `upper`.
    Pattern::FilterNotExists(vec![
        triple(lower.clone(), "rdfs:subClassOf", var(via_var)),
        triple(var(via_var), "rdfs:subClassOf", upper.clone()),
        Pattern::Filter(Expr::And(vec![
            Expr::ne(var(via_var), upper),
            Expr::ne(var(via_var), lower),
        ])),
    ])
}

fn candidate_query(extra: Option<&str>, patterns: Vec<Pattern>) -> SelectQuery {
    let mut projection = vec![Projection::var(CANDIDATE), Projection::var(CANDIDATE_NAME)];
    if let Some(column) = extra {
        projection.push(Projection::var(column));
    }
    SelectQuery::new(projection, patterns).order_by_asc(CANDIDATE_NAME)
}

// ---------------------------------------------------------------------------
// Strategy 1: predicate search
// ---------------------------------------------------------------------------

/// Ontology predicates, prefix-filtered (`Some(prefix)`) or all (`None`).
///
/// Predicates are recognized by a secondary `skos:prefLabel` starting with
/// the `predicate_id` tag; the "all" form additionally drops that tag label
/// itself from the name column.
pub fn predicate_query(ctx: &TagContext, prefix: Option<&str>, kind: RecordKind) -> SelectQuery {
    let name_filter = match prefix {
        Some(prefix) => Expr::starts_with_ci(Expr::var(CANDIDATE_NAME), Expr::literal(prefix)),
        None => Expr::Not(Box::new(Expr::starts_with_ci(
            Expr::var(CANDIDATE_NAME),
            Expr::literal(PREDICATE_LABEL_TAG),
        ))),
    };
    let mut patterns = vec![
        triple(var(CANDIDATE), "skos:prefLabel", var(CANDIDATE_NAME)),
        triple(var(CANDIDATE), "skos:prefLabel", var("tagLabel")),
        Pattern::Filter(Expr::And(vec![
            name_filter,
            Expr::starts_with_ci(Expr::var("tagLabel"), Expr::literal(PREDICATE_LABEL_TAG)),
        ])),
    ];

    if ctx.subject.is_some() || ctx.object.is_some() {
        let mut inner = vec![triple(
            var("coinAppearance"),
            "rdf:predicate",
            var(CANDIDATE),
        )];
        if let Some(subject) = &ctx.subject {
            inner.push(bound_position_union("rdf:subject", subject, "subjEntity"));
        }
        if let Some(object) = &ctx.object {
            inner.push(bound_position_union("rdf:object", object, "objEntity"));
        }
        inner.extend(statement_chain(ctx.side, kind));
        patterns.push(Pattern::FilterExists(inner));
    }

    candidate_query(None, patterns)
}

// ---------------------------------------------------------------------------
// Strategy 2: leaf search (non-class entities)
// ---------------------------------------------------------------------------

/// Entities that are instances (not classes), matching the typed prefix on
/// their display name, reported with their top-reachable superclass.
pub fn leaf_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let patterns = vec![
        triple(var(CANDIDATE), "rdf:type", var("candidateClass")),
        triple(var("candidateClass"), "rdfs:subClassOf", var(SUPER_CLASS)),
        triple(var(CANDIDATE), "skos:prefLabel", var("candidateLabel")),
        Pattern::Filter(Expr::Not(Box::new(Expr::Contains(
            Box::new(Expr::Str(Box::new(Expr::var(SUPER_CLASS)))),
            Box::new(Expr::literal(RDF_SCHEMA_NS)),
        )))),
        // Top-reachable: the reported superclass has no superclass of its own.
        Pattern::FilterNotExists(vec![
            triple(var(SUPER_CLASS), "rdfs:subClassOf", var("anyClass")),
            Pattern::Filter(Expr::ne(var(SUPER_CLASS), var("anyClass"))),
        ]),
        Pattern::Filter(Expr::And(vec![
            Expr::ne(var("candidateClass"), var(SUPER_CLASS)),
            Expr::ne(var(CANDIDATE), var(SUPER_CLASS)),
        ])),
        display_name_bind("candidateLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Direct),
    ];
    candidate_query(Some(SUPER_CLASS), patterns)
}

// ---------------------------------------------------------------------------
// Strategy 3: class search
// ---------------------------------------------------------------------------

/// Classes matching the typed prefix; occurrence is checked via instances.
pub fn class_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let patterns = vec![
        triple(var(CANDIDATE), "rdf:type", Term::prefixed("rdfs:Class")),
        triple(var(CANDIDATE), "skos:prefLabel", var("classLabel")),
        display_name_bind("classLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        Pattern::Filter(Expr::ne(var(CANDIDATE), Term::iri(EXCLUDED_CLASS))),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Instances),
    ];
    candidate_query(None, patterns)
}

// ---------------------------------------------------------------------------
// Strategy 4: simple generalize (one hop up)
// ---------------------------------------------------------------------------

/// Immediate superclass(es) of the current entity: via `rdfs:subClassOf` if
/// it is a class, via `rdf:type` (plus minimality filters) if an instance.
pub fn simple_generalize_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let current = ctx.current_iri();

    let class_arm = vec![
        triple(current.clone(), "rdfs:subClassOf", var(CANDIDATE)),
        minimality_not_exists(current.clone(), var(CANDIDATE), "anyClass"),
    ];
    let instance_arm = vec![
        triple(current.clone(), "rdf:type", var(CANDIDATE)),
        Pattern::FilterNotExists(vec![triple(
            current.clone(),
            "rdf:type",
            Term::prefixed("rdfs:Class"),
        )]),
        Pattern::FilterNotExists(vec![triple(
            var(CANDIDATE),
            "rdfs:subClassOf",
            current.clone(),
        )]),
        Pattern::FilterNotExists(vec![triple(var(CANDIDATE), "rdf:type", current.clone())]),
        // Minimal among the current entity's types.
        Pattern::FilterNotExists(vec![
            triple(current.clone(), "rdf:type", var("anyClass")),
            triple(var("anyClass"), "rdfs:subClassOf", var(CANDIDATE)),
            Pattern::Filter(Expr::And(vec![
                Expr::ne(var("anyClass"), var(CANDIDATE)),
                Expr::ne(var("anyClass"), current.clone()),
            ])),
        ]),
    ];

    let patterns = vec![
        Pattern::Union(vec![class_arm, instance_arm]),
        Pattern::Filter(Expr::ne(var(CANDIDATE), current)),
        triple(var(CANDIDATE), "skos:prefLabel", var("parentLabel")),
        display_name_bind("parentLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        Pattern::Filter(Expr::ne(var(CANDIDATE), Term::iri(EXCLUDED_CLASS))),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Instances),
    ];
    candidate_query(None, patterns)
}

// ---------------------------------------------------------------------------
// Strategy 5: simple specialize (one hop down)
// ---------------------------------------------------------------------------

/// Immediate subclasses of the current entity (no intermediate subclass).
///
/// If the existence-filtered result is empty, the caller retries with
/// [`absolute_specialize_query`] and uses that result instead.
pub fn simple_specialize_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let current = ctx.current_iri();
    let patterns = vec![
        triple(var(CANDIDATE), "rdfs:subClassOf", current.clone()),
        minimality_not_exists(var(CANDIDATE), current.clone(), "anyClass"),
        Pattern::Filter(Expr::ne(var(CANDIDATE), current)),
        triple(var(CANDIDATE), "skos:prefLabel", var("childLabel")),
        display_name_bind("childLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        Pattern::Filter(Expr::ne(var(CANDIDATE), Term::iri(EXCLUDED_CLASS))),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Instances),
    ];
    candidate_query(None, patterns)
}

// ---------------------------------------------------------------------------
// Strategy 6: absolute generalize (topmost)
// ---------------------------------------------------------------------------

/// Topmost superclass(es) reachable from the current entity.
pub fn absolute_generalize_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let current = ctx.current_iri();

    let class_arm = vec![triple(current.clone(), "rdfs:subClassOf", var(CANDIDATE))];
    let instance_arm = vec![
        triple(current.clone(), "rdf:type", var(CANDIDATE)),
        Pattern::FilterNotExists(vec![triple(
            current.clone(),
            "rdf:type",
            Term::prefixed("rdfs:Class"),
        )]),
    ];

    let patterns = vec![
        Pattern::Union(vec![class_arm, instance_arm]),
        Pattern::FilterNotExists(vec![
            triple(var(CANDIDATE), "rdfs:subClassOf", var("anyClass")),
            Pattern::Filter(Expr::ne(var(CANDIDATE), var("anyClass"))),
        ]),
        Pattern::Filter(Expr::ne(var(CANDIDATE), current)),
        triple(var(CANDIDATE), "skos:prefLabel", var("topLabel")),
        display_name_bind("topLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Instances),
    ];
    candidate_query(None, patterns)
}

// ---------------------------------------------------------------------------
// Strategy 7: absolute specialize (direct instances)
// ---------------------------------------------------------------------------

/// Direct instances (leaves) of the current entity, surfaced with its
/// topmost superclass for bucketing.
pub fn absolute_specialize_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let current = ctx.current_iri();
    let patterns = vec![
        Pattern::Optional(vec![
            triple(current.clone(), "rdfs:subClassOf", var(SUPER_CLASS)),
            Pattern::FilterNotExists(vec![
                triple(var(SUPER_CLASS), "rdfs:subClassOf", var("anyClass")),
                Pattern::Filter(Expr::ne(var(SUPER_CLASS), var("anyClass"))),
            ]),
        ]),
        triple(var(CANDIDATE), "rdf:type", current),
        Pattern::FilterNotExists(vec![triple(
            var(CANDIDATE),
            "rdf:type",
            Term::prefixed("rdfs:Class"),
        )]),
        triple(var(CANDIDATE), "skos:prefLabel", var("leafLabel")),
        display_name_bind("leafLabel", CANDIDATE_NAME),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Direct),
    ];
    candidate_query(Some(SUPER_CLASS), patterns)
}

// ---------------------------------------------------------------------------
// Strategy 8: equivalent/sibling
// ---------------------------------------------------------------------------

/// Entities/classes sharing an immediate parent with the current entity:
/// class↔class via `rdfs:subClassOf` and instance↔instance via `rdf:type`,
/// unioned, with the same minimality discipline as generalization.
pub fn equivalent_query(ctx: &TagContext, kind: RecordKind) -> SelectQuery {
    let current = ctx.current_iri();

    let class_arm = vec![
        triple(current.clone(), "rdfs:subClassOf", var("parent")),
        minimality_not_exists(current.clone(), var("parent"), "anyClass"),
        triple(var(CANDIDATE), "rdfs:subClassOf", var("parent")),
        minimality_not_exists(var(CANDIDATE), var("parent"), "anyClass"),
        Pattern::Filter(Expr::ne(var(CANDIDATE), var("parent"))),
        triple(var(CANDIDATE), "skos:prefLabel", var("siblingLabel")),
        display_name_bind("siblingLabel", CANDIDATE_NAME),
    ];
    let instance_arm = vec![
        triple(current.clone(), "rdf:type", var("parent")),
        Pattern::FilterNotExists(vec![triple(
            current.clone(),
            "rdf:type",
            Term::prefixed("rdfs:Class"),
        )]),
        Pattern::FilterNotExists(vec![triple(
            var("parent"),
            "rdfs:subClassOf",
            current.clone(),
        )]),
        Pattern::FilterNotExists(vec![triple(var("parent"), "rdf:type", current.clone())]),
        Pattern::FilterNotExists(vec![
            triple(current.clone(), "rdf:type", var("anyClass")),
            triple(var("anyClass"), "rdfs:subClassOf", var("parent")),
            Pattern::Filter(Expr::And(vec![
                Expr::ne(var("anyClass"), var("parent")),
                Expr::ne(var("anyClass"), current.clone()),
            ])),
        ]),
        triple(var(CANDIDATE), "rdf:type", var("parent")),
        Pattern::FilterNotExists(vec![
            triple(var(CANDIDATE), "rdfs:subClassOf", var("anyClass")),
            Pattern::Filter(Expr::ne(var("parent"), var("anyClass"))),
        ]),
        Pattern::Filter(Expr::ne(var(CANDIDATE), var("parent"))),
        triple(var(CANDIDATE), "skos:prefLabel", var("siblingLabel")),
        display_name_bind("siblingLabel", CANDIDATE_NAME),
    ];

    let patterns = vec![
        // Topmost type of the current entity, for bucketing; absent for
        // class inputs.
        Pattern::Optional(vec![
            triple(current.clone(), "rdf:type", var(SUPER_CLASS)),
            Pattern::FilterNotExists(vec![
                triple(var(SUPER_CLASS), "rdfs:subClassOf", var("anyClass")),
                Pattern::Filter(Expr::ne(var(SUPER_CLASS), var("anyClass"))),
            ]),
            Pattern::FilterNotExists(vec![triple(
                current.clone(),
                "rdf:type",
                Term::prefixed("rdfs:Class"),
            )]),
        ]),
        Pattern::Union(vec![class_arm, instance_arm]),
        name_prefix_filter(CANDIDATE_NAME, &ctx.filter),
        Pattern::Filter(Expr::ne(var("parent"), current.clone())),
        Pattern::Filter(Expr::ne(var(CANDIDATE), current)),
        occurrence_filter(ctx, kind, CANDIDATE, CandidateMode::Either),
    ];
    candidate_query(Some(SUPER_CLASS), patterns)
}

/// Whether the bound (possibly class-typed) subject participates in any
/// triple at all on the given side and record kind.
pub fn subject_participation_query(subject: &str, side: Side, kind: RecordKind) -> SelectQuery {
    let mut inner = vec![bound_position_union("rdf:subject", subject, "subjEntity")];
    inner.extend(statement_chain(side, kind));
    SelectQuery::new(
        vec![Projection::var("coinURI")],
        vec![Pattern::FilterExists(inner)],
    )
    .with_limit(1)
}
