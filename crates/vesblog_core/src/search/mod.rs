//! Search-criteria handling for list queries.
//!
//! # Responsibility
//! - Define the filter/sort/pagination request shape shared by all
//!   list operations.
//! - Compile criteria into parameterized SQL fragments.
//!
//! # Invariants
//! - Caller values are always bound, never spliced into SQL.
//! - Total counts are computed from the filtered, unpaginated set.

pub mod criteria;
