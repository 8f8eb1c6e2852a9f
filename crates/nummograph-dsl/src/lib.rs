//! Nummograph query surface types.
//!
//! This crate defines the two small languages the search core is built on:
//!
//! - [`bool_term`]: the boolean search-term DSL the tag-builder UI submits
//!   (`C1 AND (NOT C2 OR C3)`), with a parser and a De Morgan normalizer.
//! - [`sparql`]: a typed SPARQL graph-pattern AST (triples, optional blocks,
//!   unions, exists/not-exists filters, binds, aggregate sub-selects) that is
//!   serialized to concrete query text at the very end.
//!
//! Keeping both as typed trees — rather than query text threaded through
//! string substitution — is what makes the compiler and the hierarchy
//! navigator unit-testable without diffing generated SPARQL.

pub mod bool_term;
pub mod sparql;
