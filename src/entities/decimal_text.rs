//! Decimal column stored as canonical text.
//!
//! SQLite has no exact numeric storage, so amounts and rates are persisted as
//! their `Decimal` string form. Reading a value back yields the identical
//! `Decimal`, including its scale, which keeps regenerated rows byte-identical.

use rust_decimal::Decimal;
use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, Value, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, DbErr, QueryResult, TryGetError, TryGetable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `Decimal` persisted as a TEXT column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecimalText(pub Decimal);

impl DecimalText {
    /// Returns the wrapped decimal.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for DecimalText {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<DecimalText> for Decimal {
    fn from(value: DecimalText) -> Self {
        value.0
    }
}

impl fmt::Display for DecimalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<DecimalText> for Value {
    fn from(value: DecimalText) -> Self {
        Self::String(Some(Box::new(value.0.to_string())))
    }
}

impl TryGetable for DecimalText {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        let raw = <String as TryGetable>::try_get_by(res, index)?;
        raw.parse::<Decimal>().map(Self).map_err(|e| {
            TryGetError::DbErr(DbErr::Type(format!(
                "stored decimal {raw:?} is not parseable: {e}"
            )))
        })
    }
}

impl ValueType for DecimalText {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(raw)) => raw.parse::<Decimal>().map(Self).map_err(|_| ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        stringify!(DecimalText).to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl Nullable for DecimalText {
    fn null() -> Value {
        Value::String(None)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_value_keeps_scale() {
        let value: Value = DecimalText(dec!(25000.00)).into();
        assert_eq!(value, Value::String(Some(Box::new("25000.00".to_string()))));

        let back = <DecimalText as ValueType>::try_from(value).unwrap();
        assert_eq!(back.0.scale(), 2);
        assert_eq!(back, DecimalText(dec!(25000.00)));
    }

    #[test]
    fn test_non_text_value_is_rejected() {
        assert!(<DecimalText as ValueType>::try_from(Value::Int(Some(3))).is_err());
        assert!(<DecimalText as ValueType>::try_from(Value::String(Some(Box::new("abc".into())))).is_err());
    }
}
