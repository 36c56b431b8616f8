use std::fmt;

use bincode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Integer(i32),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(num) => write!(f, "{}", num),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Row payload as stored by the in-memory row source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Row {
    rowid: u64,
    attributes: Vec<FieldValue>,
}

impl Row {
    const BINCODE_CONFIG: bincode::config::Configuration<bincode::config::BigEndian> =
        bincode::config::standard().with_big_endian();

    pub fn new(rowid: u64, attributes: Vec<FieldValue>) -> Self {
        Self { rowid, attributes }
    }

    pub fn into_attributes(self) -> Vec<FieldValue> {
        self.attributes
    }
}

impl TryFrom<Row> for Box<[u8]> {
    type Error = bincode::error::EncodeError;

    #[instrument(parent = None, level = "trace")]
    fn try_from(row: Row) -> Result<Box<[u8]>, Self::Error> {
        let row_encoded = bincode::serde::encode_to_vec::<(u64, Vec<FieldValue>), _>(
            (row.rowid, row.attributes),
            Row::BINCODE_CONFIG,
        )?;

        Ok(row_encoded.into_boxed_slice())
    }
}

impl TryFrom<&[u8]> for Row {
    type Error = bincode::error::DecodeError;

    #[instrument(parent = None, level = "trace")]
    fn try_from(bytes: &[u8]) -> Result<Row, Self::Error> {
        let ((rowid, attributes), _) = bincode::serde::decode_from_slice::<
            (u64, Vec<FieldValue>),
            _,
        >(bytes, Self::BINCODE_CONFIG)?;
        Ok(Self { rowid, attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_row_decodes_to_same_values() {
        let row = Row::new(
            7,
            vec![FieldValue::Integer(-3), FieldValue::Text("seven".into()), FieldValue::Null],
        );
        let bytes: Box<[u8]> = row.clone().try_into().unwrap();
        let decoded = Row::try_from(&bytes[..]).unwrap();
        assert_eq!(decoded, row);
        assert_eq!(
            decoded
                .into_attributes()
                .iter()
                .map(FieldValue::to_string)
                .collect::<Vec<_>>(),
            vec!["-3", "seven", "NULL"]
        );
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(Row::try_from(&[0xff_u8, 0xff, 0xff][..]).is_err());
    }
}
