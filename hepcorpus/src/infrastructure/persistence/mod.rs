// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! On-disk corpus plumbing: the transaction log, the per-variable record
//! writers and their bounded cache, and the side indices.

pub mod lru_cache;
pub mod record_reader;
pub mod record_writer;
pub mod string_dictionary;
pub mod string_set_store;
pub mod transaction;
pub mod variable_index;

pub use lru_cache::{EvictableWriter, WriterCache};
pub use record_reader::{ReadError, ReadGroup, ReadRecord, RecordStreamReader};
pub use record_writer::{RecordWriter, RECORDS_FILE, STRINGS_FILE};
pub use string_dictionary::StringDictionary;
pub use string_set_store::StringSetStore;
pub use transaction::{FileMode, Transaction, TxFile};
pub use variable_index::{VariableEntry, VariableIndex};
