//! Core data model for the statutory corpus

mod domain;
mod edge;
mod unit;

pub use domain::{Domain, DomainId, DomainPhase};
pub use edge::{NeighborEdge, NeighborKind, RelationMatch};
pub use unit::{Document, NodeKind, ParagraphInfo, Unit, UnitId};
