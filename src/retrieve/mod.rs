//! Node and relation retrieval

mod expand;
mod ine;
mod relation;
mod rne;
mod types;

pub use ine::NearestQuery;
pub use relation::RelationQuery;
pub use rne::RangeQuery;
pub use types::{merge_hits, Hit, HitSource, RelationHit};
