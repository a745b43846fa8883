//! In-memory table with DBF record layout.
//!
//! Each record is stored as the raw fixed-width bytes a DBF file would
//! hold: one deletion-flag byte (`' '` live, `'*'` deleted) followed by
//! every field's text. Field values are decoded on each read, so an
//! expression always sees the bytes of the record that is current now.

use crate::table::{FieldDef, FieldValue, RecordCursor, Table, TableError, TableResult};
use log::debug;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

const DELETED_FLAG: u8 = b'*';
const LIVE_FLAG: u8 = b' ';

/// Serializable description of a table and its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// One text value per field for each record
    #[serde(default)]
    pub records: Vec<Vec<String>>,
    /// One-based numbers of records flagged as deleted
    #[serde(default)]
    pub deleted: Vec<u32>,
}

pub struct MemoryTable {
    name: String,
    fields: Vec<FieldDef>,
    /// Byte offset of each field within a record, after the flag byte.
    offsets: Vec<usize>,
    record_len: usize,
    records: RwLock<Vec<Vec<u8>>>,
    /// One-based current record number, 0 before the first positioning.
    current: Mutex<u32>,
}

impl MemoryTable {
    /// Create an empty table after validating the schema.
    pub fn new(name: &str, fields: Vec<FieldDef>) -> TableResult<Self> {
        if fields.is_empty() {
            return Err(TableError::InvalidFieldDef(
                "table needs at least one field".to_string(),
            ));
        }

        let mut offsets = Vec::with_capacity(fields.len());
        let mut offset = 1;
        for (i, field) in fields.iter().enumerate() {
            field.validate()?;
            if fields[..i]
                .iter()
                .any(|f| f.name.eq_ignore_ascii_case(&field.name))
            {
                return Err(TableError::InvalidFieldDef(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
            offsets.push(offset);
            offset += field.length;
        }

        debug!(
            "Created table {} with {} fields, record length {}",
            name,
            fields.len(),
            offset
        );

        Ok(Self {
            name: name.to_ascii_uppercase(),
            fields,
            offsets,
            record_len: offset,
            records: RwLock::new(Vec::new()),
            current: Mutex::new(0),
        })
    }

    /// Build and fill a table from its description; the first record is
    /// left current.
    pub fn from_spec(spec: &TableSpec) -> TableResult<Self> {
        let table = Self::new(&spec.name, spec.fields.clone())?;
        for values in &spec.records {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            table.append(&values)?;
        }
        for &recno in &spec.deleted {
            table.goto_record(recno)?;
            table.delete_record()?;
        }
        if !spec.records.is_empty() {
            table.goto_record(1)?;
        }
        Ok(table)
    }

    /// Length of one record including the deletion flag.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// Append a record given one text value per field and make it current.
    pub fn append(&self, values: &[&str]) -> TableResult<u32> {
        if values.len() != self.fields.len() {
            return Err(TableError::InvalidFieldDef(format!(
                "expected {} values, got {}",
                self.fields.len(),
                values.len()
            )));
        }

        let mut record = Vec::with_capacity(self.record_len);
        record.push(LIVE_FLAG);
        for (field, value) in self.fields.iter().zip(values) {
            record.extend(field.encode(value)?);
        }

        let mut records = self.records.write();
        records.push(record);
        let recno = records.len() as u32;
        *self.current.lock() = recno;
        Ok(recno)
    }

    /// Overwrite one field of the current record.
    pub fn put_field(&self, index: usize, value: &str) -> TableResult<()> {
        let field = self.field_def(index)?;
        let encoded = field.encode(value)?;
        let start = self.offsets[index];
        self.with_current_mut(|record| {
            record[start..start + field.length].copy_from_slice(&encoded);
        })
    }

    pub fn delete_record(&self) -> TableResult<()> {
        self.with_current_mut(|record| record[0] = DELETED_FLAG)
    }

    pub fn undelete_record(&self) -> TableResult<()> {
        self.with_current_mut(|record| record[0] = LIVE_FLAG)
    }

    /// Raw bytes of the current record.
    pub fn record_bytes(&self) -> TableResult<Vec<u8>> {
        let slot = self.current_slot()?;
        Ok(self.records.read()[slot].clone())
    }

    fn field_def(&self, index: usize) -> TableResult<&FieldDef> {
        self.fields
            .get(index)
            .ok_or(TableError::FieldIndexOutOfBounds {
                index,
                field_count: self.fields.len(),
            })
    }

    fn current_slot(&self) -> TableResult<usize> {
        match *self.current.lock() {
            0 => Err(TableError::NoCurrentRecord),
            n => Ok(n as usize - 1),
        }
    }

    fn with_current_mut<F>(&self, f: F) -> TableResult<()>
    where
        F: FnOnce(&mut Vec<u8>),
    {
        let slot = self.current_slot()?;
        let mut records = self.records.write();
        f(&mut records[slot]);
        Ok(())
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    fn field_value(&self, index: usize) -> TableResult<FieldValue> {
        let field = self.field_def(index)?;
        let slot = self.current_slot()?;
        let start = self.offsets[index];
        let records = self.records.read();
        field.decode(&records[slot][start..start + field.length])
    }

    fn current_record_number(&self) -> u32 {
        *self.current.lock()
    }

    fn record_count(&self) -> TableResult<u32> {
        Ok(self.records.read().len() as u32)
    }

    fn is_current_record_deleted(&self) -> TableResult<bool> {
        let slot = self.current_slot()?;
        Ok(self.records.read()[slot][0] == DELETED_FLAG)
    }
}

impl RecordCursor for MemoryTable {
    fn goto_record(&self, recno: u32) -> TableResult<()> {
        let record_count = self.record_count()?;
        if recno == 0 || recno > record_count {
            return Err(TableError::InvalidRecordNumber {
                recno,
                record_count,
            });
        }
        *self.current.lock() = recno;
        Ok(())
    }
}
