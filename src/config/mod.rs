/// Database configuration and connection management
pub mod database;

/// Ledger settings loaded from the TOML config file
pub mod settings;

pub use settings::{
    AllocationSettings, AttendanceSettings, CompanySettings, Settings, StoreSettings,
};
