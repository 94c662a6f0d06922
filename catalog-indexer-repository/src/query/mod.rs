//! Backend-neutral query port.
//!
//! A [`SearchQuery`](catalog_indexer_shared::SearchQuery) is translated per
//! entity kind into a [`QueryPlan`] by [`plan_query`]. Backends only ever see
//! the plan, so swapping the storage engine does not touch the query rules.

mod plan;
mod planner;

pub use plan::{Predicate, QueryPlan, SortSpec, KEYWORD_SUFFIX};
pub use planner::plan_query;
