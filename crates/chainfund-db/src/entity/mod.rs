//! database entity models for sea-orm.
//!
//! these entities map to database tables and handle conversion between
//! column values and the validated domain types in `chainfund-types`.
//! conversions out of the database are fallible: a row holding an
//! unparseable wallet or status is reported as invalid data.

pub mod approval_event;
pub mod campaign;
pub mod donation;
pub mod milestone_approval;
pub mod user;
