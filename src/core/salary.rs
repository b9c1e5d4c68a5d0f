//! Salary structure business logic - Component definitions and their resolution.
//!
//! A structure is a monthly wage plus named components. Each component is an
//! earning or a deduction whose amount is a fixed sum, a percentage of the
//! wage, a percentage of another component, or (for at most one earning) the
//! part of the wage the other earnings leave.
//!
//! Resolution is ordered: `Basic` first, then every other component after the
//! components it depends on, then the wage remainder. Cycles are rejected when
//! the structure is saved, so a stored structure always resolves.

use crate::{
    core::{employee, store},
    entities::{
        BasisKind, ComponentKind, DecimalText, SalaryComponent, SalaryStructure, salary_component,
        salary_structure,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Name of the mandatory component every structure starts from.
pub const BASIC: &str = "Basic";

/// How a component's amount is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Basis {
    /// A fixed monthly amount
    Fixed {
        /// Amount
        amount: Decimal,
    },
    /// A percentage of the wage
    PercentOfWage {
        /// Percentage, e.g. 50 for half
        percent: Decimal,
    },
    /// A percentage of another component's resolved amount
    PercentOfComponent {
        /// Referenced component name
        component: String,
        /// Percentage of it
        percent: Decimal,
    },
    /// The wage minus every other earning, floored at zero
    WageRemainder,
}

impl Basis {
    const fn kind(&self) -> BasisKind {
        match self {
            Self::Fixed { .. } => BasisKind::Fixed,
            Self::PercentOfWage { .. } => BasisKind::PercentOfWage,
            Self::PercentOfComponent { .. } => BasisKind::PercentOfComponent,
            Self::WageRemainder => BasisKind::WageRemainder,
        }
    }

    fn value(&self) -> Decimal {
        match self {
            Self::Fixed { amount } => *amount,
            Self::PercentOfWage { percent } | Self::PercentOfComponent { percent, .. } => *percent,
            Self::WageRemainder => Decimal::ZERO,
        }
    }

    fn base_component(&self) -> Option<&str> {
        match self {
            Self::PercentOfComponent { component, .. } => Some(component),
            _ => None,
        }
    }
}

/// One named line of a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Name, unique within the structure
    pub name: String,
    /// Earning or deduction
    pub kind: ComponentKind,
    /// Amount rule
    pub basis: Basis,
}

impl Component {
    /// An earning component.
    pub fn earning(name: impl Into<String>, basis: Basis) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Earning,
            basis,
        }
    }

    /// A deduction component.
    pub fn deduction(name: impl Into<String>, basis: Basis) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Deduction,
            basis,
        }
    }
}

/// The current salary definition of an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Owner
    pub employee_id: i64,
    /// Monthly wage
    pub wage: Decimal,
    /// Components in display order
    pub components: Vec<Component>,
    /// Last replacement time
    pub updated_at: DateTime<Utc>,
}

impl Structure {
    /// Resolves every component to an amount.
    pub fn breakdown(&self) -> Result<Breakdown> {
        resolve(self.wage, &self.components)
    }
}

/// A resolved component amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Component name
    pub name: String,
    /// Earning or deduction
    pub kind: ComponentKind,
    /// Amount rounded to cents
    pub amount: Decimal,
}

/// Resolved amounts of a structure, all rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    /// One line per component, in display order
    pub lines: Vec<Line>,
    /// The `Basic` amount
    pub basic: Decimal,
    /// Every earning except `Basic`
    pub allowances: Decimal,
    /// Every deduction
    pub deductions: Decimal,
    /// `basic + allowances - deductions`
    pub net: Decimal,
}

/// Rounds half away from zero to two decimal places, always carrying scale 2.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidSalaryStructure {
        message: message.into(),
    }
}

fn overflow(name: &str) -> Error {
    invalid(format!("amount of {name} overflows"))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

fn visit(
    at: usize,
    components: &[Component],
    index: &HashMap<&str, usize>,
    state: &mut [Visit],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<()> {
    match state[at] {
        Visit::Done => return Ok(()),
        Visit::Active => {
            let start = path.iter().position(|&i| i == at).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|&i| components[i].name.clone())
                .collect();
            cycle.push(components[at].name.clone());
            return Err(Error::CyclicComponentBasis { cycle });
        }
        Visit::New => {}
    }

    state[at] = Visit::Active;
    path.push(at);
    if let Some(base) = components[at].basis.base_component() {
        let dep = *index.get(base).ok_or_else(|| {
            invalid(format!(
                "{} references unknown component {base}",
                components[at].name
            ))
        })?;
        visit(dep, components, index, state, path, order)?;
    }
    path.pop();
    state[at] = Visit::Done;
    order.push(at);
    Ok(())
}

/// Checks a structure and returns the order its components resolve in.
///
/// # Errors
/// * `InvalidSalaryStructure` - negative wage or value, blank or duplicate
///   name, missing or malformed `Basic`, unknown or remainder base, more than
///   one remainder, remainder deduction
/// * `CyclicComponentBasis` - components reference each other in a loop
pub fn validate(wage: Decimal, components: &[Component]) -> Result<Vec<usize>> {
    if wage.is_sign_negative() {
        return Err(invalid(format!("wage {wage} is negative")));
    }

    let mut index = HashMap::with_capacity(components.len());
    for (i, component) in components.iter().enumerate() {
        let name = component.name.as_str();
        if name.trim().is_empty() || name.trim() != name {
            return Err(invalid(format!("component name {name:?} is blank or padded")));
        }
        if index.insert(name, i).is_some() {
            return Err(invalid(format!("component {name} appears twice")));
        }
        if component.basis.value().is_sign_negative() {
            return Err(invalid(format!("component {name} has a negative value")));
        }
    }

    let basic = *index
        .get(BASIC)
        .ok_or_else(|| invalid(format!("a {BASIC} component is required")))?;
    let basic_component = &components[basic];
    if basic_component.kind != ComponentKind::Earning
        || !matches!(
            basic_component.basis,
            Basis::Fixed { .. } | Basis::PercentOfWage { .. }
        )
    {
        return Err(invalid(format!(
            "{BASIC} must be a fixed or percent-of-wage earning"
        )));
    }

    let remainders: Vec<usize> = components
        .iter()
        .enumerate()
        .filter(|(_, c)| c.basis == Basis::WageRemainder)
        .map(|(i, _)| i)
        .collect();
    if remainders.len() > 1 {
        return Err(invalid("only one wage-remainder component is allowed"));
    }
    let remainder = remainders.first().copied();
    if let Some(r) = remainder {
        if components[r].kind != ComponentKind::Earning {
            return Err(invalid(format!(
                "wage remainder {} must be an earning",
                components[r].name
            )));
        }
        if referenced_components(components).contains(components[r].name.as_str()) {
            return Err(invalid(format!(
                "wage remainder {} cannot be a percentage base",
                components[r].name
            )));
        }
    }

    let mut state = vec![Visit::New; components.len()];
    let mut order = Vec::with_capacity(components.len());
    let mut path = Vec::new();
    state[basic] = Visit::Done;
    order.push(basic);
    for i in 0..components.len() {
        if Some(i) != remainder {
            visit(i, components, &index, &mut state, &mut path, &mut order)?;
        }
    }
    order.extend(remainder);
    Ok(order)
}

/// Validates and resolves a structure to rounded amounts.
pub fn resolve(wage: Decimal, components: &[Component]) -> Result<Breakdown> {
    let order = validate(wage, components)?;
    let hundred = Decimal::ONE_HUNDRED;
    let mut amounts: HashMap<&str, Decimal> = HashMap::with_capacity(components.len());
    let mut earned = Decimal::ZERO;

    for i in order {
        let component = &components[i];
        let name = component.name.as_str();
        let raw = match &component.basis {
            Basis::Fixed { amount } => *amount,
            Basis::PercentOfWage { percent } => wage
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(hundred))
                .ok_or_else(|| overflow(name))?,
            Basis::PercentOfComponent {
                component: base,
                percent,
            } => amounts
                .get(base.as_str())
                .copied()
                .unwrap_or_default()
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(hundred))
                .ok_or_else(|| overflow(name))?,
            Basis::WageRemainder => wage
                .checked_sub(earned)
                .ok_or_else(|| overflow(name))?
                .max(Decimal::ZERO),
        };
        let amount = round_money(raw);
        if component.kind == ComponentKind::Earning {
            earned = earned.checked_add(amount).ok_or_else(|| overflow(name))?;
        }
        amounts.insert(name, amount);
    }

    let mut lines = Vec::with_capacity(components.len());
    let mut basic = Decimal::ZERO;
    let mut allowances = Decimal::ZERO;
    let mut deductions = Decimal::ZERO;
    for component in components {
        let amount = amounts
            .get(component.name.as_str())
            .copied()
            .unwrap_or_default();
        match component.kind {
            ComponentKind::Earning if component.name == BASIC => basic = amount,
            ComponentKind::Earning => {
                allowances = allowances
                    .checked_add(amount)
                    .ok_or_else(|| overflow(&component.name))?;
            }
            ComponentKind::Deduction => {
                deductions = deductions
                    .checked_add(amount)
                    .ok_or_else(|| overflow(&component.name))?;
            }
        }
        lines.push(Line {
            name: component.name.clone(),
            kind: component.kind,
            amount,
        });
    }

    let net = basic
        .checked_add(allowances)
        .and_then(|v| v.checked_sub(deductions))
        .ok_or_else(|| overflow("net salary"))?;

    Ok(Breakdown {
        lines,
        basic: round_money(basic),
        allowances: round_money(allowances),
        deductions: round_money(deductions),
        net: round_money(net),
    })
}

fn component_from_row(row: salary_component::Model) -> Result<Component> {
    let value = row.value.value();
    let basis = match row.basis {
        BasisKind::Fixed => Basis::Fixed { amount: value },
        BasisKind::PercentOfWage => Basis::PercentOfWage { percent: value },
        BasisKind::PercentOfComponent => Basis::PercentOfComponent {
            component: row.base_component.ok_or_else(|| Error::Store {
                message: format!("component {} has no base component", row.name),
            })?,
            percent: value,
        },
        BasisKind::WageRemainder => Basis::WageRemainder,
    };
    Ok(Component {
        name: row.name,
        kind: row.kind,
        basis,
    })
}

pub(crate) fn structure_from_rows(
    structure: salary_structure::Model,
    mut rows: Vec<salary_component::Model>,
) -> Result<Structure> {
    rows.sort_by_key(|row| row.position);
    Ok(Structure {
        employee_id: structure.employee_id,
        wage: structure.wage.value(),
        components: rows
            .into_iter()
            .map(component_from_row)
            .collect::<Result<_>>()?,
        updated_at: structure.updated_at,
    })
}

/// Replaces an employee's salary structure.
///
/// The structure row is upserted on `employee_id` and its components are
/// replaced in the same transaction. The structure is validated and fully
/// resolved before the store is touched, so every stored structure can be
/// paid.
///
/// # Errors
/// * `InvalidSalaryStructure` / `CyclicComponentBasis` - see [`validate`]
/// * `EmployeeNotFound` / `EmployeeInactive` - unknown or deactivated employee
#[instrument(skip(db, components))]
pub async fn upsert_salary_structure(
    db: &DatabaseConnection,
    employee_id: i64,
    wage: Decimal,
    components: Vec<Component>,
) -> Result<Structure> {
    resolve(wage, &components)?;

    let updated_at = Utc::now();
    let txn = store::begin_serializable(db).await?;
    employee::require_active(&txn, employee_id).await?;

    SalaryStructure::insert(salary_structure::ActiveModel {
        employee_id: Set(employee_id),
        wage: Set(DecimalText::from(wage)),
        updated_at: Set(updated_at),
    })
    .on_conflict(
        OnConflict::column(salary_structure::Column::EmployeeId)
            .update_columns([
                salary_structure::Column::Wage,
                salary_structure::Column::UpdatedAt,
            ])
            .to_owned(),
    )
    .exec_without_returning(&txn)
    .await
    .map_err(|e| employee::employee_fk_error(e, employee_id))?;

    SalaryComponent::delete_many()
        .filter(salary_component::Column::EmployeeId.eq(employee_id))
        .exec(&txn)
        .await?;

    let rows = components.iter().zip(0..).map(|(component, position)| {
        salary_component::ActiveModel {
            employee_id: Set(employee_id),
            name: Set(component.name.clone()),
            kind: Set(component.kind),
            basis: Set(component.basis.kind()),
            value: Set(DecimalText::from(component.basis.value())),
            base_component: Set(component.basis.base_component().map(str::to_string)),
            position: Set(position),
            ..Default::default()
        }
    });
    SalaryComponent::insert_many(rows)
        .exec_without_returning(&txn)
        .await
        .map_err(|e| {
            if store::is_unique_violation(&e) {
                invalid("component names must be unique")
            } else {
                e.into()
            }
        })?;

    txn.commit().await?;
    info!(employee_id, components = components.len(), "Salary structure saved");

    Ok(Structure {
        employee_id,
        wage,
        components,
        updated_at,
    })
}

/// Returns the current structure of an employee, or `None` if never set.
pub async fn get_salary_structure<C>(db: &C, employee_id: i64) -> Result<Option<Structure>>
where
    C: ConnectionTrait,
{
    let Some(structure) = SalaryStructure::find_by_id(employee_id).one(db).await? else {
        debug!(employee_id, "No salary structure");
        return Ok(None);
    };
    let rows = SalaryComponent::find()
        .filter(salary_component::Column::EmployeeId.eq(employee_id))
        .order_by_asc(salary_component::Column::Position)
        .all(db)
        .await?;
    structure_from_rows(structure, rows).map(Some)
}

/// Loads every stored structure keyed by employee.
pub(crate) async fn all_structures<C>(db: &C) -> Result<HashMap<i64, Structure>>
where
    C: ConnectionTrait,
{
    let loaded = SalaryStructure::find()
        .find_with_related(SalaryComponent)
        .all(db)
        .await?;
    loaded
        .into_iter()
        .map(|(structure, rows)| {
            let structure = structure_from_rows(structure, rows)?;
            Ok((structure.employee_id, structure))
        })
        .collect()
}

/// Names referenced as a percentage base anywhere in the structure.
fn referenced_components(components: &[Component]) -> HashSet<&str> {
    components
        .iter()
        .filter_map(|c| c.basis.base_component())
        .collect()
}
