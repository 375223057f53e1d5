use serde_json::{Map, Value};

use super::{Compact, DecodePolicy, Object, ProtocolError, keys};
use crate::{DataColumn, DataRow, DataSet, DataTable, TypedValue};

impl Compact for DataColumn {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert(keys::COLUMN_FIELD.into(), self.field_name().into());
        if self.display_caption() != self.field_name() {
            map.insert(keys::COLUMN_CAPTION.into(), self.display_caption().into());
        }
        map.insert(keys::COLUMN_TYPE.into(), self.type_name().into());
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "column")?;
        obj.known_keys(&[keys::COLUMN_FIELD, keys::COLUMN_CAPTION, keys::COLUMN_TYPE], policy)?;

        let mut column = DataColumn::new(obj.str(keys::COLUMN_FIELD)?, obj.str(keys::COLUMN_TYPE)?);
        if let Some(caption) = obj.opt_str(keys::COLUMN_CAPTION)? {
            column = column.caption(caption);
        }
        Ok(column)
    }
}

impl Compact for DataTable {
    fn to_compact(&self) -> Value {
        let rows = self
            .rows()
            .iter()
            .map(|row| {
                Value::Object(row.iter().map(|(name, value)| (name.to_owned(), value.to_compact())).collect())
            })
            .collect();

        let mut map = Map::with_capacity(3);
        map.insert(keys::TABLE_NAME.into(), self.name().into());
        map.insert(keys::TABLE_COLUMNS.into(), self.columns().iter().map(Compact::to_compact).collect());
        map.insert(keys::TABLE_ROWS.into(), Value::Array(rows));
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "table")?;
        obj.known_keys(&[keys::TABLE_NAME, keys::TABLE_COLUMNS, keys::TABLE_ROWS], policy)?;

        let mut table = DataTable::new(obj.str(keys::TABLE_NAME)?);

        if obj.opt(keys::TABLE_COLUMNS).is_some() {
            for column in obj.array(keys::TABLE_COLUMNS)? {
                table
                    .add_column(DataColumn::from_compact(column, policy)?)
                    .map_err(|e| ProtocolError::new(e.reason().to_owned()))?;
            }
        }

        if obj.opt(keys::TABLE_ROWS).is_some() {
            for row in obj.array(keys::TABLE_ROWS)? {
                let cells = Object::new(row, "row")?;
                let row = cells
                    .map
                    .iter()
                    .map(|(name, value)| Ok::<_, ProtocolError>((name.clone(), TypedValue::from_compact(value, policy)?)))
                    .collect::<Result<DataRow, ProtocolError>>()?;
                table
                    .push_row(row)
                    .map_err(|e| ProtocolError::new(e.reason().to_owned()))?;
            }
        }

        Ok(table)
    }
}

impl Compact for DataSet {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert(keys::DATASET_NAME.into(), self.name().into());
        map.insert(keys::DATASET_TABLES.into(), self.tables().iter().map(Compact::to_compact).collect());
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "dataset")?;
        obj.known_keys(&[keys::DATASET_NAME, keys::DATASET_TABLES], policy)?;

        let mut set = DataSet::new(obj.opt_str(keys::DATASET_NAME)?.unwrap_or_default());
        if obj.opt(keys::DATASET_TABLES).is_some() {
            for table in obj.array(keys::DATASET_TABLES)? {
                set.add_table(DataTable::from_compact(table, policy)?)
                    .map_err(|e| ProtocolError::new(e.reason().to_owned()))?;
            }
        }
        Ok(set)
    }
}
