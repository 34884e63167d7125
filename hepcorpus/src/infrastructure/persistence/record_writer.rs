// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record Writer
//!
//! One writer per variable directory, owning two handles: the append-only
//! `records.bin` and the directory's string dictionary. A group write
//! emits the group header followed by each record:
//!
//! ```text
//! group header:
//!   varint inspire_record
//!   varint table_num
//!   f32    cmenergies
//!   string reaction
//!   string observables
//!   string var_y
//!   varint record_count
//!
//! record:
//!   f32 x_low, f32 x_high, f32 y,
//!   varint error_count, {varint label_id, f32 minus, f32 plus}*
//! ```
//!
//! Error labels are interned into the dictionary as they are encoded, so
//! every `label_id` written here is a valid dictionary index by
//! construction. All bytes go through the active transaction; `close`
//! schedules both handles for transactional closure and a second close is
//! a hard error.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use hepcorpus_domain::value_objects::binary_format::{
    encode_f32, encode_size, encode_string, encode_varint,
};
use hepcorpus_domain::{CorpusError, GroupMetadata, Record};

use super::lru_cache::EvictableWriter;
use super::string_dictionary::StringDictionary;
use super::transaction::{FileMode, Transaction, TxFile};

/// Record stream file inside a variable directory.
pub const RECORDS_FILE: &str = "records.bin";
/// String dictionary file inside a variable directory.
pub const STRINGS_FILE: &str = "strings.txt";

/// Appends record groups to one variable's `records.bin`.
pub struct RecordWriter {
    dir: PathBuf,
    records: Rc<TxFile>,
    strings: StringDictionary,
    closed: bool,
}

impl RecordWriter {
    /// Opens (creating if needed) the record stream and dictionary of
    /// `dir`.
    pub fn open(dir: &Path) -> Result<Self, CorpusError> {
        let records = TxFile::open_append(&dir.join(RECORDS_FILE), FileMode::Binary)?;
        let strings = StringDictionary::open(&dir.join(STRINGS_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            records,
            strings,
            closed: false,
        })
    }

    /// Encodes a group header plus `records` into the transaction.
    pub fn write_group(
        &mut self,
        txn: &mut Transaction,
        metadata: &GroupMetadata,
        records: &[Record],
    ) -> Result<(), CorpusError> {
        if self.closed {
            return Err(CorpusError::internal_error(format!(
                "group write on closed writer for {}",
                self.dir.display()
            )));
        }

        let mut buf = Vec::new();
        encode_varint(metadata.inspire_record, &mut buf)?;
        encode_varint(metadata.table_num, &mut buf)?;
        encode_f32(metadata.cmenergies, &mut buf);
        encode_string(&metadata.reaction, &mut buf)?;
        encode_string(&metadata.observables, &mut buf)?;
        encode_string(&metadata.var_y, &mut buf)?;
        encode_size(records.len(), &mut buf)?;

        for record in records {
            encode_f32(record.x_low, &mut buf);
            encode_f32(record.x_high, &mut buf);
            encode_f32(record.y, &mut buf);
            encode_size(record.errors.len(), &mut buf)?;
            for error in &record.errors {
                let label_id = self.strings.id_for(&error.label, txn)?;
                encode_varint(label_id as i64, &mut buf)?;
                encode_f32(error.minus, &mut buf);
                encode_f32(error.plus, &mut buf);
            }
        }

        txn.write_binary(&self.records, &buf)
    }

    /// The variable directory this writer belongs to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Schedules both handles for closure through `txn`.
    ///
    /// Closing twice is a programming error and fails with
    /// [`CorpusError::DoubleClose`].
    pub fn close(&mut self, txn: &mut Transaction) -> Result<(), CorpusError> {
        if self.closed {
            return Err(CorpusError::DoubleClose(self.dir.display().to_string()));
        }
        self.closed = true;
        txn.schedule_close(&self.records)?;
        self.strings.close(txn)?;
        Ok(())
    }
}

impl EvictableWriter for RecordWriter {
    fn close(&mut self, txn: &mut Transaction) -> Result<(), CorpusError> {
        RecordWriter::close(self, txn)
    }
}
