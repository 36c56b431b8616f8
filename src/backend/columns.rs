use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::row::FieldValue;

pub trait ColumnType {
    fn validate(&self, input: &str) -> Option<FieldValue>;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum IntegerType {
    Int,
}

impl ColumnType for IntegerType {
    fn validate(&self, input: &str) -> Option<FieldValue> {
        match self {
            IntegerType::Int => Some(FieldValue::Integer(input.parse::<i32>().ok()?)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum TextType {
    Varchar(u8),
}

impl ColumnType for TextType {
    fn validate(&self, input: &str) -> Option<FieldValue> {
        match self {
            TextType::Varchar(max_size) => {
                if input.len() <= *max_size as usize {
                    Some(FieldValue::Text(input.to_owned()))
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ColumnItemType {
    Integer(IntegerType),
    Text(TextType),
}

impl ColumnType for ColumnItemType {
    fn validate(&self, input: &str) -> Option<FieldValue> {
        match self {
            ColumnItemType::Integer(int_type) => int_type.validate(input),
            ColumnItemType::Text(text_type) => text_type.validate(input),
        }
    }
}

/// Column metadata of a row source, in ordinal order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Columns(Vec<(String, ColumnItemType)>);

impl From<Vec<(&str, ColumnItemType)>> for Columns {
    fn from(columns_vec: Vec<(&str, ColumnItemType)>) -> Self {
        Columns(
            columns_vec
                .into_iter()
                .map(|(name, column_type)| (name.to_owned(), column_type))
                .collect(),
        )
    }
}

impl Deref for Columns {
    type Target = [(String, ColumnItemType)];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Columns {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn to_printable(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.to_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_respects_column_types() {
        let int = ColumnItemType::Integer(IntegerType::Int);
        assert_eq!(int.validate("42"), Some(FieldValue::Integer(42)));
        assert_eq!(int.validate("forty-two"), None);

        let text = ColumnItemType::Text(TextType::Varchar(3));
        assert_eq!(text.validate("abc"), Some(FieldValue::Text("abc".to_string())));
        assert_eq!(text.validate("abcd"), None);
    }

    #[test]
    fn columns_keep_ordinal_order() {
        let columns = Columns::from(vec![
            ("name", ColumnItemType::Text(TextType::Varchar(16))),
            ("id", ColumnItemType::Integer(IntegerType::Int)),
        ]);
        assert_eq!(columns.to_printable(), vec!["name", "id"]);
    }
}
