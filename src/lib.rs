//! A static call-graph tracker and argument-flow analyzer.
//!
//! Given pre-parsed program metadata — packages, functions, types and the call
//! graph linking them — this crate builds a **Tracker Tree**: an owned,
//! arena-backed tree rooted at each `main` entry point that reifies which
//! functions call which, how their arguments are shaped, where a variable's
//! value actually came from, and which concrete type an embedded-interface
//! method call resolves to. It does not parse source code, emit any wire
//! format, or decide what a downstream pattern-matching extractor does with
//! the result — it only builds the tree.
//!
//! ```text
//! MetadataSource (ingest layer, out of scope)
//!   -> MetadataIndex       (C2 — inverted indices over the call graph)
//!   -> TrackerTree::new    (C6 — recursive, budget-bounded tree construction)
//! ```
//!
//! Construction is synchronous and read-only afterwards: every accessor on
//! [`TrackerTree`] takes `&self`, so multiple callers can traverse concurrently
//! (see [`TrackerTree::par_traverse`]).

pub mod classify;
pub mod handle;
pub mod ids;
pub mod index;
pub mod interfaces;
pub mod limits;
pub mod model;
pub mod trace;
pub mod tree;

pub use classify::{classify, ArgumentType};
pub use handle::{Handle, StringInterner};
pub use ids::{base_id, call_id, full_id, generic_id};
pub use index::MetadataIndex;
pub use interfaces::InterfaceResolver;
pub use limits::{Limits, LimitsError};
pub use model::{
    Assignment, AssignmentKey, Call, CallArgument, CallGraphEdge, EdgeId, Function, InterfaceKey,
    Metadata, MetadataSource, Origin, Package, ParamKey, SourceFile, TypeDef, Variable,
};
pub use trace::trace_variable_origin;
pub use tree::{NodeId, TrackerNode, TrackerTree};
