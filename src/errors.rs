//! Unified error type for the ledger.
//!
//! Raw store errors never cross the public API: unique and foreign-key
//! violations are translated at the insert site into the domain error for
//! that operation, and everything else is classified by [`From<DbErr>`].
//! Lock contention that outlasted the busy timeout is retryable.

use sea_orm::{ConnAcquireErr, DbErr};
use thiserror::Error;

/// Every failure a ledger operation can report.
#[derive(Debug, Error)]
pub enum Error {
    // --- attendance ---
    /// A record for (employee, date) already exists.
    #[error("Employee {employee_id} already checked in on {date}")]
    AlreadyCheckedIn {
        /// Employee attempting the check-in
        employee_id: i64,
        /// Calendar date of the existing record
        date: chrono::NaiveDate,
    },

    /// Check-out attempted without a check-in for the day.
    #[error("No check-in found for employee {employee_id} on {date}")]
    NoCheckInFound {
        /// Employee attempting the check-out
        employee_id: i64,
        /// Calendar date that has no record
        date: chrono::NaiveDate,
    },

    /// Check-out attempted twice for the same day.
    #[error("Employee {employee_id} already checked out on {date}")]
    AlreadyCheckedOut {
        /// Employee attempting the check-out
        employee_id: i64,
        /// Calendar date of the closed record
        date: chrono::NaiveDate,
    },

    // --- leave ---
    /// Leave request whose start date is after its end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested first day
        start: chrono::NaiveDate,
        /// Requested last day
        end: chrono::NaiveDate,
    },

    /// Leave request id does not exist.
    #[error("Leave request {leave_id} not found")]
    NotFound {
        /// Requested id
        leave_id: i64,
    },

    /// Leave request is already APPROVED or REJECTED.
    #[error("Leave request {leave_id} was already reviewed ({status})")]
    AlreadyReviewed {
        /// Reviewed request
        leave_id: i64,
        /// Terminal status it holds
        status: String,
    },

    // --- identifiers and employees ---
    /// Lost the allocation race too many times, or the serial space is full.
    #[error("Could not allocate an employee code for prefix {prefix} after {attempts} attempts")]
    AllocationExhausted {
        /// Prefix being allocated
        prefix: String,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// A name, company code or year cannot produce a well-formed code.
    #[error("Invalid {field} for employee code: {value:?}")]
    InvalidNameInput {
        /// Offending input field
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Email is already used by another employee.
    #[error("An employee with email {email} already exists")]
    EmailTaken {
        /// Conflicting address
        email: String,
    },

    /// Employee id does not exist.
    #[error("Employee {employee_id} not found")]
    EmployeeNotFound {
        /// Requested id
        employee_id: i64,
    },

    /// Employee exists but has been deactivated.
    #[error("Employee {employee_id} is inactive")]
    EmployeeInactive {
        /// Deactivated id
        employee_id: i64,
    },

    // --- salary and payroll ---
    /// Employee has no salary structure.
    #[error("Employee {employee_id} has no salary structure")]
    NoSalaryStructure {
        /// Employee without a structure
        employee_id: i64,
    },

    /// Salary structure failed validation.
    #[error("Invalid salary structure: {message}")]
    InvalidSalaryStructure {
        /// What is wrong with it
        message: String,
    },

    /// Component bases reference each other in a loop.
    #[error("Salary components form a cycle: {}", cycle.join(" -> "))]
    CyclicComponentBasis {
        /// Component names along the cycle
        cycle: Vec<String>,
    },

    /// Month is not in `YYYY-MM` form.
    #[error("Invalid payroll month {month:?}, expected YYYY-MM")]
    InvalidMonth {
        /// Rejected input
        month: String,
    },

    /// The payroll batch was aborted and nothing was written.
    #[error("Payroll generation for {month} failed: {message}")]
    PayrollGenerationFailed {
        /// Month being generated
        month: String,
        /// Underlying cause
        message: String,
    },

    // --- access ---
    /// Principal asked for rows outside its scope.
    #[error("Principal {employee_id} may not access {resource}")]
    Forbidden {
        /// Requesting principal
        employee_id: i64,
        /// What was requested
        resource: String,
    },

    // --- infrastructure ---
    /// The store did not answer in time; nothing was applied.
    #[error("Store operation timed out: {message}")]
    Timeout {
        /// Context
        message: String,
    },

    /// The store cannot be reached; nothing was applied.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Context
        message: String,
    },

    /// Any other store failure.
    #[error("Store error: {message}")]
    Store {
        /// Context
        message: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Stable, machine-readable code for the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyCheckedIn { .. } => "ALREADY_CHECKED_IN",
            Self::NoCheckInFound { .. } => "NO_CHECK_IN_FOUND",
            Self::AlreadyCheckedOut { .. } => "ALREADY_CHECKED_OUT",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyReviewed { .. } => "ALREADY_REVIEWED",
            Self::AllocationExhausted { .. } => "ALLOCATION_EXHAUSTED",
            Self::InvalidNameInput { .. } => "INVALID_NAME_INPUT",
            Self::EmailTaken { .. } => "EMAIL_TAKEN",
            Self::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
            Self::EmployeeInactive { .. } => "EMPLOYEE_INACTIVE",
            Self::NoSalaryStructure { .. } => "NO_SALARY_STRUCTURE",
            Self::InvalidSalaryStructure { .. } => "INVALID_SALARY_STRUCTURE",
            Self::CyclicComponentBasis { .. } => "CYCLIC_COMPONENT_BASIS",
            Self::InvalidMonth { .. } => "INVALID_MONTH",
            Self::PayrollGenerationFailed { .. } => "PAYROLL_GENERATION_FAILED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Timeout { .. } => "TIMEOUT",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::Store { .. } => "STORE_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::EnvVar(_) => "ENV_VAR_ERROR",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::StoreUnavailable { .. } | Self::AllocationExhausted { .. }
        )
    }
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        if crate::core::store::is_busy(&value) {
            return Self::StoreUnavailable {
                message: format!("store is locked by another writer: {value}"),
            };
        }
        match value {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => Self::Timeout {
                message: "timed out acquiring a store connection".to_string(),
            },
            DbErr::ConnectionAcquire(e) => Self::StoreUnavailable {
                message: e.to_string(),
            },
            DbErr::Conn(e) => Self::StoreUnavailable {
                message: e.to_string(),
            },
            other => Self::Store {
                message: other.to_string(),
            },
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
