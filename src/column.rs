//! Column descriptions.

use std::fmt;

use crate::error::{Error, Result};

/// Column data type.
///
/// Types without a dedicated variant are kept as [`DataType::Other`] and
/// decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Other(String),
}

impl DataType {
    /// Parse a non-nullable type name.
    pub fn parse(name: &str) -> Self {
        match name {
            "Bool" | "Boolean" => DataType::Bool,
            "Int8" => DataType::Int8,
            "Int16" => DataType::Int16,
            "Int32" => DataType::Int32,
            "Int64" => DataType::Int64,
            "UInt8" => DataType::UInt8,
            "UInt16" => DataType::UInt16,
            "UInt32" => DataType::UInt32,
            "UInt64" => DataType::UInt64,
            "Float32" => DataType::Float32,
            "Float64" => DataType::Float64,
            "String" => DataType::String,
            other => DataType::Other(other.to_string()),
        }
    }

    /// Type name as written by the server.
    pub fn name(&self) -> &str {
        match self {
            DataType::Bool => "Bool",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::UInt8 => "UInt8",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
            DataType::String => "String",
            DataType::Other(name) => name,
        }
    }

    /// Width in bytes of the binary encoding, `None` for variable-width types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => Some(8),
            DataType::String | DataType::Other(_) => None,
        }
    }
}

/// A column of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl Column {
    /// Create a column from its name and a type string such as `Nullable(Int32)`.
    pub fn of(name: impl Into<String>, type_name: &str) -> Self {
        let type_name = type_name.trim();
        let (inner, nullable) = match type_name
            .strip_prefix("Nullable(")
            .and_then(|s| s.strip_suffix(')'))
        {
            Some(inner) => (inner.trim(), true),
            None => (type_name, false),
        };
        Self {
            name: name.into(),
            data_type: DataType::parse(inner),
            nullable,
        }
    }

    /// Create a column from a `name type` declaration, e.g. `id UInt64`.
    pub fn parse(declaration: &str) -> Result<Self> {
        let declaration = declaration.trim();
        match declaration.split_once(char::is_whitespace) {
            Some((name, type_name)) if !name.is_empty() && !type_name.trim().is_empty() => {
                Ok(Self::of(name, type_name))
            }
            _ => Err(Error::InvalidUsage(format!(
                "Invalid column declaration: {:?}",
                declaration
            ))),
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column data type, without the `Nullable` wrapper.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Whether the column accepts NULL.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Full type name including the `Nullable` wrapper.
    pub fn type_name(&self) -> String {
        if self.nullable {
            format!("Nullable({})", self.data_type.name())
        } else {
            self.data_type.name().to_string()
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.type_name())
    }
}

/// Columns assumed when neither hints nor a header describe the response.
///
/// A single nullable string column named `results`.
pub fn default_columns() -> Vec<Column> {
    vec![Column::of("results", "Nullable(String)")]
}

/// Parse a comma separated list of column declarations, e.g. `a Int32, b String`.
pub fn parse_columns(declarations: &str) -> Result<Vec<Column>> {
    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in declarations.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            // Commas inside `Decimal(10, 2)` and friends belong to the type
            ',' if depth == 0 => {
                push_declaration(&mut columns, &declarations[start..i])?;
                start = i + 1;
            }
            _ => {}
        }
    }
    push_declaration(&mut columns, &declarations[start..])?;
    Ok(columns)
}

fn push_declaration(columns: &mut Vec<Column>, declaration: &str) -> Result<()> {
    if !declaration.trim().is_empty() {
        columns.push(Column::parse(declaration)?);
    }
    Ok(())
}
