//! Core business logic - framework-agnostic ledger operations.
//!
//! Every operation takes the database handle explicitly; the store is the
//! only shared state and transactions are the only synchronisation.

/// Caller identity and row scoping
pub mod access;
/// Per-day check-in / check-out ledger
pub mod attendance;
/// Employee provisioning, profiles and deactivation
pub mod employee;
/// Employee code allocation
pub mod identifier;
/// Leave requests and review
pub mod leave;
/// Monthly payroll generation
pub mod payroll;
/// Read-only rollups
pub mod report;
/// Salary structures and component resolution
pub mod salary;
/// Transaction and constraint helpers
pub(crate) mod store;
