// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record Stream Reader
//!
//! Decoder for a variable's `records.bin` under the fixed group grammar.
//! There are no length prefixes at the group level; the stream terminates
//! at end-of-file, so EOF is only legal at a group boundary and anywhere
//! else is reported as corruption. The corpus checker and the round-trip
//! tests are the consumers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use hepcorpus_domain::value_objects::binary_format::{
    decode_f32, decode_string, decode_varint, try_decode_varint,
};
use hepcorpus_domain::CorpusError;

/// A decoded group: header fields plus its records.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadGroup {
    pub inspire_record: i64,
    pub table_num: i64,
    pub cmenergies: f32,
    pub reaction: String,
    pub observables: String,
    pub var_y: String,
    pub records: Vec<ReadRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadRecord {
    pub x_low: f32,
    pub x_high: f32,
    pub y: f32,
    pub errors: Vec<ReadError>,
}

/// A decoded error triple; the label is still a dictionary id here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadError {
    pub label_id: u64,
    pub minus: f32,
    pub plus: f32,
}

/// Streaming reader over an EOF-delimited sequence of groups.
pub struct RecordStreamReader<R: Read> {
    reader: R,
}

impl RecordStreamReader<BufReader<File>> {
    /// Opens `path` for sequential group reading.
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let file = File::open(path).map_err(|e| {
            CorpusError::io_error(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RecordStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next group, or `None` on a clean end of stream.
    pub fn read_group(&mut self) -> Result<Option<ReadGroup>, CorpusError> {
        let inspire_record = match try_decode_varint(&mut self.reader)? {
            Some(value) => value as i64,
            None => return Ok(None),
        };

        let table_num = decode_varint(&mut self.reader)? as i64;
        let cmenergies = decode_f32(&mut self.reader)?;
        let reaction = decode_string(&mut self.reader)?;
        let observables = decode_string(&mut self.reader)?;
        let var_y = decode_string(&mut self.reader)?;
        let record_count = decode_varint(&mut self.reader)?;

        let mut records = Vec::with_capacity(record_count.min(1 << 20) as usize);
        for _ in 0..record_count {
            records.push(self.read_record()?);
        }

        Ok(Some(ReadGroup {
            inspire_record,
            table_num,
            cmenergies,
            reaction,
            observables,
            var_y,
            records,
        }))
    }

    fn read_record(&mut self) -> Result<ReadRecord, CorpusError> {
        let x_low = decode_f32(&mut self.reader)?;
        let x_high = decode_f32(&mut self.reader)?;
        let y = decode_f32(&mut self.reader)?;

        let error_count = decode_varint(&mut self.reader)?;
        let mut errors = Vec::with_capacity(error_count.min(1 << 16) as usize);
        for _ in 0..error_count {
            let label_id = decode_varint(&mut self.reader)?;
            let minus = decode_f32(&mut self.reader)?;
            let plus = decode_f32(&mut self.reader)?;
            errors.push(ReadError { label_id, minus, plus });
        }

        Ok(ReadRecord { x_low, x_high, y, errors })
    }
}
