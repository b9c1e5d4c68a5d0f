//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the ledger tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance_record;
pub mod decimal_text;
pub mod employee;
pub mod employee_profile;
pub mod leave_request;
pub mod payroll_record;
pub mod salary_component;
pub mod salary_structure;

// Re-export specific types to avoid conflicts
pub use attendance_record::{
    AttendanceStatus, Column as AttendanceColumn, Entity as AttendanceRecord,
    Model as AttendanceModel,
};
pub use decimal_text::DecimalText;
pub use employee::{Column as EmployeeColumn, Entity as Employee, Model as EmployeeModel, Role};
pub use employee_profile::{
    Column as EmployeeProfileColumn, Entity as EmployeeProfile, Model as EmployeeProfileModel,
};
pub use leave_request::{
    Column as LeaveRequestColumn, Entity as LeaveRequest, LeaveStatus, LeaveType,
    Model as LeaveRequestModel,
};
pub use payroll_record::{
    Column as PayrollRecordColumn, Entity as PayrollRecord, Model as PayrollRecordModel,
};
pub use salary_component::{
    BasisKind, Column as SalaryComponentColumn, ComponentKind, Entity as SalaryComponent,
    Model as SalaryComponentModel,
};
pub use salary_structure::{
    Column as SalaryStructureColumn, Entity as SalaryStructure, Model as SalaryStructureModel,
};
