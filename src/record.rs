//! Records and record decoding.

use std::sync::Arc;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// One row of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record. `values` must be in column order.
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Columns of the response this record belongs to.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.name() == name)?;
        self.values.get(index)
    }

    /// Get a value by position, converted into `T`.
    pub fn try_get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or_else(|| {
            Error::Decode(format!(
                "column index {} out of range ({} columns)",
                index,
                self.values.len()
            ))
        })?;
        T::from_any(value)
    }
}

/// Trait for mapping a [`Record`] into a caller-chosen shape.
pub trait FromRecord: Sized {
    /// Build `Self` from a record.
    fn from_record(record: Record) -> Result<Self>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> Result<Self> {
        Ok(record)
    }
}

impl FromRecord for Vec<Value> {
    fn from_record(record: Record) -> Result<Self> {
        Ok(record.into_values())
    }
}

// Tuple implementations via macro
macro_rules! impl_from_record {
    ($count:expr, $($idx:tt: $T:ident),+) => {
        impl<$($T: FromValue),+> FromRecord for ($($T,)+) {
            fn from_record(record: Record) -> Result<Self> {
                if record.len() < $count {
                    return Err(Error::Decode(format!(
                        "not enough columns for tuple: {} < {}",
                        record.len(),
                        $count
                    )));
                }
                Ok(($($T::from_any(&record.values[$idx])?,)+))
            }
        }
    };
}

impl_from_record!(1, 0: T0);
impl_from_record!(2, 0: T0, 1: T1);
impl_from_record!(3, 0: T0, 1: T1, 2: T2);
impl_from_record!(4, 0: T0, 1: T1, 2: T2, 3: T3);
impl_from_record!(5, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_from_record!(6, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_from_record!(7, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_from_record!(8, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);
impl_from_record!(9, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8);
impl_from_record!(10, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9);
impl_from_record!(11, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10);
impl_from_record!(12, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10, 11: T11);
