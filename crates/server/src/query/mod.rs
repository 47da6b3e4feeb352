//! Query-string → database-query translation.
//!
//! Two cooperating stages back every list endpoint:
//! - [`normalize`]: raw query pairs → typed filter tree + control
//!   directives (select, sort, page, limit)
//! - [`ResultAssembler`]: count + windowed fetch + optional relation
//!   population → uniform [`types::ResultEnvelope`]

pub mod assemble;
pub mod builder;
pub mod normalize;
pub mod types;

pub use assemble::ResultAssembler;
pub use normalize::normalize;
pub use types::{
    ComparisonOp, ControlDirectives, FilterClause, FilterCondition, FilterExpression, FilterValue,
    PageLink, Pagination, RelationSpec, ResultEnvelope, SortDirection, SortKey,
};
