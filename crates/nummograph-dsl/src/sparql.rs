//! Typed SPARQL graph-pattern AST and renderer.
//!
//! The search core builds every query — coin search fragments, hierarchy
//! recommendations, availability probes — as a tree of [`Pattern`] clauses and
//! only serializes to SPARQL text at the outermost entry point. The AST covers
//! exactly the clause shapes the core needs: basic triples, `OPTIONAL`,
//! `UNION`, `FILTER`, `FILTER (NOT) EXISTS`, `BIND`, and one aggregate
//! sub-select form (`SAMPLE` + `GROUP BY`) used for template-record
//! thumbnails.
//!
//! Rendering is infallible; validity is enforced by construction.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A term position inside a triple or expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// Full IRI, rendered in angle brackets.
    Iri(String),
    /// Prefixed name (`nmo:hasObverse`), rendered verbatim.
    Prefixed(String),
    /// Variable, rendered with a leading `?`.
    Var(String),
    /// Plain string literal, rendered quoted and escaped.
    Literal(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn prefixed(value: impl Into<String>) -> Self {
        Term::Prefixed(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        Term::Var(name.strip_prefix('?').map(str::to_string).unwrap_or(name))
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(value.into())
    }

    fn render(&self) -> String {
        match self {
            Term::Iri(iri) => format!("<{iri}>"),
            Term::Prefixed(name) => name.clone(),
            Term::Var(name) => format!("?{name}"),
            Term::Literal(value) => string_lit(value),
        }
    }
}

/// SPARQL filter/bind expressions, restricted to the forms the core emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Term(Term),
    Str(Box<Expr>),
    Lang(Box<Expr>),
    Lcase(Box<Expr>),
    Ucase(Box<Expr>),
    /// `SUBSTR(expr, start)` / `SUBSTR(expr, start, len)` (1-based).
    Substr(Box<Expr>, u32, Option<u32>),
    /// `REPLACE(expr, pattern, replacement)`.
    Replace(Box<Expr>, String, String),
    Concat(Vec<Expr>),
    StrStarts(Box<Expr>, Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    /// `regex(expr, pattern)` / `regex(expr, pattern, flags)`.
    Regex(Box<Expr>, String, Option<String>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Term(Term::var(name))
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Expr::Term(Term::iri(value))
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Term(Term::literal(value))
    }

    pub fn ne(left: Term, right: Term) -> Self {
        Expr::Ne(Box::new(Expr::Term(left)), Box::new(Expr::Term(right)))
    }

    /// `STRSTARTS(LCASE(haystack), LCASE(prefix))` — the case-insensitive
    /// prefix test used throughout the recommendation queries.
    pub fn starts_with_ci(haystack: Expr, prefix: Expr) -> Self {
        Expr::StrStarts(
            Box::new(Expr::Lcase(Box::new(haystack))),
            Box::new(Expr::Lcase(Box::new(prefix))),
        )
    }

    fn render(&self) -> String {
        match self {
            Expr::Term(t) => t.render(),
            Expr::Str(e) => format!("STR({})", e.render()),
            Expr::Lang(e) => format!("LANG({})", e.render()),
            Expr::Lcase(e) => format!("LCASE({})", e.render()),
            Expr::Ucase(e) => format!("UCASE({})", e.render()),
            Expr::Substr(e, start, len) => match len {
                Some(len) => format!("SUBSTR({}, {start}, {len})", e.render()),
                None => format!("SUBSTR({}, {start})", e.render()),
            },
            Expr::Replace(e, pattern, replacement) => format!(
                "REPLACE({}, {}, {})",
                e.render(),
                string_lit(pattern),
                string_lit(replacement)
            ),
            Expr::Concat(parts) => {
                let inner: Vec<String> = parts.iter().map(Expr::render).collect();
                format!("CONCAT({})", inner.join(", "))
            }
            Expr::StrStarts(a, b) => format!("STRSTARTS({}, {})", a.render(), b.render()),
            Expr::Contains(a, b) => format!("CONTAINS({}, {})", a.render(), b.render()),
            Expr::Regex(e, pattern, flags) => match flags {
                Some(flags) => format!(
                    "regex({}, {}, {})",
                    e.render(),
                    string_lit(pattern),
                    string_lit(flags)
                ),
                None => format!("regex({}, {})", e.render(), string_lit(pattern)),
            },
            Expr::Eq(a, b) => format!("{} = {}", a.render(), b.render()),
            Expr::Ne(a, b) => format!("{} != {}", a.render(), b.render()),
            Expr::And(parts) => {
                let inner: Vec<String> = parts.iter().map(|e| e.render_grouped()).collect();
                inner.join(" && ")
            }
            Expr::Not(e) => format!("!{}", e.render_grouped()),
        }
    }

    // Comparisons and conjunctions need parentheses when nested.
    fn render_grouped(&self) -> String {
        match self {
            Expr::Eq(..) | Expr::Ne(..) | Expr::And(..) => format!("({})", self.render()),
            _ => self.render(),
        }
    }
}

/// One clause of a graph pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Triple {
        subject: Term,
        predicate: Term,
        object: Term,
    },
    /// `{ ... }` grouping.
    Group(Vec<Pattern>),
    Optional(Vec<Pattern>),
    /// `{ arm1 } UNION { arm2 } ...`
    Union(Vec<Vec<Pattern>>),
    Filter(Expr),
    FilterExists(Vec<Pattern>),
    FilterNotExists(Vec<Pattern>),
    Bind { expr: Expr, var: String },
    SubSelect(SelectQuery),
}

impl Pattern {
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Pattern::Triple {
            subject,
            predicate,
            object,
        }
    }

    pub fn bind(expr: Expr, var: impl Into<String>) -> Self {
        let var = var.into();
        Pattern::Bind {
            expr,
            var: var.strip_prefix('?').map(str::to_string).unwrap_or(var),
        }
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            Pattern::Triple {
                subject,
                predicate,
                object,
            } => {
                let _ = writeln!(
                    out,
                    "{pad}{} {} {} .",
                    subject.render(),
                    predicate.render(),
                    object.render()
                );
            }
            Pattern::Group(patterns) => {
                let _ = writeln!(out, "{pad}{{");
                render_all(patterns, out, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Pattern::Optional(patterns) => {
                let _ = writeln!(out, "{pad}OPTIONAL {{");
                render_all(patterns, out, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Pattern::Union(arms) => {
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        let _ = writeln!(out, "{pad}UNION");
                    }
                    let _ = writeln!(out, "{pad}{{");
                    render_all(arm, out, depth + 1);
                    let _ = writeln!(out, "{pad}}}");
                }
            }
            Pattern::Filter(expr) => {
                let _ = writeln!(out, "{pad}FILTER({})", expr.render());
            }
            Pattern::FilterExists(patterns) => {
                let _ = writeln!(out, "{pad}FILTER EXISTS {{");
                render_all(patterns, out, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Pattern::FilterNotExists(patterns) => {
                let _ = writeln!(out, "{pad}FILTER NOT EXISTS {{");
                render_all(patterns, out, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Pattern::Bind { expr, var } => {
                let _ = writeln!(out, "{pad}BIND({} AS ?{var})", expr.render());
            }
            Pattern::SubSelect(query) => {
                let _ = writeln!(out, "{pad}{{");
                query.render_body(out, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }
}

fn render_all(patterns: &[Pattern], out: &mut String, depth: usize) {
    for p in patterns {
        p.render_into(out, depth);
    }
}

/// A projected column of a `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Var(String),
    /// `(SAMPLE(?var) AS ?alias)`.
    Sample { var: String, alias: String },
}

impl Projection {
    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        Projection::Var(name.strip_prefix('?').map(str::to_string).unwrap_or(name))
    }

    pub fn sample(var: impl Into<String>, alias: impl Into<String>) -> Self {
        Projection::Sample {
            var: var.into(),
            alias: alias.into(),
        }
    }

    fn render(&self) -> String {
        match self {
            Projection::Var(name) => format!("?{name}"),
            Projection::Sample { var, alias } => format!("(SAMPLE(?{var}) AS ?{alias})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub var: String,
    pub ascending: bool,
}

/// A complete `SELECT` query (or aggregate sub-select).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// `(prefix, iri)` pairs emitted as `PREFIX` declarations.
    pub prefixes: Vec<(String, String)>,
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub patterns: Vec<Pattern>,
    pub group_by: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
}

impl SelectQuery {
    pub fn new(projection: Vec<Projection>, patterns: Vec<Pattern>) -> Self {
        SelectQuery {
            prefixes: Vec::new(),
            distinct: true,
            projection,
            patterns,
            group_by: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn with_prefixes(mut self, prefixes: &[(&str, &str)]) -> Self {
        self.prefixes = prefixes
            .iter()
            .map(|(p, iri)| (p.to_string(), iri.to_string()))
            .collect();
        self
    }

    pub fn order_by_asc(mut self, var: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            var: var.into(),
            ascending: true,
        });
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (prefix, iri) in &self.prefixes {
            let _ = writeln!(out, "PREFIX {prefix}: <{iri}>");
        }
        self.render_body(&mut out, 0);
        out
    }

    fn render_body(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let projection = if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection
                .iter()
                .map(Projection::render)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        let _ = writeln!(out, "{pad}SELECT {distinct}{projection} WHERE {{");
        render_all(&self.patterns, out, depth + 1);
        let _ = write!(out, "{pad}}}");
        if !self.group_by.is_empty() {
            let vars: Vec<String> = self.group_by.iter().map(|v| format!("?{v}")).collect();
            let _ = write!(out, " GROUP BY {}", vars.join(" "));
        }
        if let Some(order) = &self.order_by {
            let dir = if order.ascending { "ASC" } else { "DESC" };
            let _ = write!(out, " ORDER BY {dir}(?{})", order.var);
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, " LIMIT {limit}");
        }
        let _ = writeln!(out);
    }
}

fn string_lit(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_triples_and_optionals() {
        let q = SelectQuery::new(
            vec![Projection::var("url")],
            vec![
                Pattern::triple(
                    Term::var("url"),
                    Term::prefixed("rdf:type"),
                    Term::prefixed("nmo:NumismaticObject"),
                ),
                Pattern::Optional(vec![Pattern::triple(
                    Term::var("url"),
                    Term::prefixed("nmo:hasWeight"),
                    Term::var("weight"),
                )]),
            ],
        );
        let text = q.render();
        assert!(text.contains("SELECT DISTINCT ?url WHERE {"));
        assert!(text.contains("?url rdf:type nmo:NumismaticObject ."));
        assert!(text.contains("OPTIONAL {"));
        assert!(text.contains("?url nmo:hasWeight ?weight ."));
    }

    #[test]
    fn renders_union_arms_between_groups() {
        let arm = |name: &str| {
            vec![Pattern::triple(
                Term::var("x"),
                Term::prefixed("rdf:subject"),
                Term::iri(name),
            )]
        };
        let mut out = String::new();
        Pattern::Union(vec![arm("http://a"), arm("http://b")]).render_into(&mut out, 0);
        let expected = "{\n  ?x rdf:subject <http://a> .\n}\nUNION\n{\n  ?x rdf:subject <http://b> .\n}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn renders_exists_filters_nested() {
        let mut out = String::new();
        Pattern::FilterNotExists(vec![
            Pattern::triple(Term::var("c"), Term::prefixed("rdfs:subClassOf"), Term::var("any")),
            Pattern::Filter(Expr::ne(Term::var("c"), Term::var("any"))),
        ])
        .render_into(&mut out, 1);
        assert!(out.starts_with("  FILTER NOT EXISTS {\n"));
        assert!(out.contains("    ?c rdfs:subClassOf ?any .\n"));
        assert!(out.contains("    FILTER(?c != ?any)\n"));
    }

    #[test]
    fn renders_display_name_bind() {
        let strip = Expr::Replace(
            Box::new(Expr::Str(Box::new(Expr::var("label")))),
            "^.*[/_#]".to_string(),
            String::new(),
        );
        let bind = Pattern::bind(
            Expr::Concat(vec![
                Expr::Ucase(Box::new(Expr::Substr(Box::new(strip.clone()), 1, Some(1)))),
                Expr::Lcase(Box::new(Expr::Substr(Box::new(strip), 2, None))),
            ]),
            "name",
        );
        let mut out = String::new();
        bind.render_into(&mut out, 0);
        assert_eq!(
            out,
            "BIND(CONCAT(UCASE(SUBSTR(REPLACE(STR(?label), \"^.*[/_#]\", \"\"), 1, 1)), \
             LCASE(SUBSTR(REPLACE(STR(?label), \"^.*[/_#]\", \"\"), 2))) AS ?name)\n"
        );
    }

    #[test]
    fn renders_aggregate_sub_select() {
        let sub = SelectQuery {
            prefixes: Vec::new(),
            distinct: false,
            projection: vec![
                Projection::var("url"),
                Projection::sample("thumb", "thumbnailObverse"),
            ],
            patterns: vec![Pattern::triple(
                Term::var("obj"),
                Term::prefixed("nmo:hasTypeSeriesItem"),
                Term::var("url"),
            )],
            group_by: vec!["url".to_string()],
            order_by: None,
            limit: None,
        };
        let mut out = String::new();
        Pattern::SubSelect(sub).render_into(&mut out, 0);
        assert!(out.contains("SELECT ?url (SAMPLE(?thumb) AS ?thumbnailObverse) WHERE {"));
        assert!(out.contains("} GROUP BY ?url"));
    }

    #[test]
    fn escapes_literals() {
        assert_eq!(
            Term::literal("say \"hi\"\n").render(),
            "\"say \\\"hi\\\"\\n\""
        );
    }

    #[test]
    fn filter_expressions_group_nested_comparisons() {
        let e = Expr::And(vec![
            Expr::starts_with_ci(Expr::var("name"), Expr::literal("art")),
            Expr::ne(Term::var("a"), Term::var("b")),
        ]);
        assert_eq!(
            e.render(),
            "STRSTARTS(LCASE(?name), LCASE(\"art\")) && (?a != ?b)"
        );
    }
}
