//! Section Registry
//!
//! Owns the ordered collection of section records and the claim/retire
//! primitives the control loop drives. Claiming walks a monotonic cursor
//! instead of rescanning the whole list; records never become un-written,
//! so the cursor only ever moves forward.

use crate::drafting::types::{SectionRecord, SectionSpec};
use crate::error::EngineError;

/// Ordered section records with at most one active at a time
#[derive(Debug)]
pub struct SectionRegistry {
    records: Vec<SectionRecord>,

    /// Next index to examine when claiming
    cursor: usize,

    /// Index of the record currently being researched/written
    active: Option<usize>,
}

impl SectionRegistry {
    /// Create a registry with one record per spec, in presentation order
    pub fn new(specs: Vec<SectionSpec>) -> Self {
        Self {
            records: specs.into_iter().map(SectionRecord::new).collect(),
            cursor: 0,
            active: None,
        }
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the registry holds no sections
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in presentation order
    pub fn records(&self) -> &[SectionRecord] {
        &self.records
    }

    /// The record at `index`
    pub fn record(&self, index: usize) -> &SectionRecord {
        &self.records[index]
    }

    /// Mutable access to the record at `index`
    pub fn record_mut(&mut self, index: usize) -> &mut SectionRecord {
        &mut self.records[index]
    }

    /// Claim the next unwritten section that requires research
    ///
    /// Marks it active and zeroes its iteration counter. Returns `None`
    /// when no such section remains. Must not be called while a section
    /// is active; that sequencing is the control loop's responsibility.
    pub fn claim_next(&mut self) -> Option<usize> {
        debug_assert!(
            self.active.is_none(),
            "claim_next called while a section is active"
        );

        while self.cursor < self.records.len() {
            let index = self.cursor;
            self.cursor += 1;

            let record = &mut self.records[index];
            if !record.is_written && record.spec.requires_research {
                record.is_active = true;
                record.search_iterations = 0;
                self.active = Some(index);
                return Some(index);
            }
        }
        None
    }

    /// Index of the active record, if any
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active record, if any
    pub fn active_record(&self) -> Option<&SectionRecord> {
        self.active.map(|index| &self.records[index])
    }

    /// Retire the active record
    ///
    /// Sets `is_written`, clears `is_active`, and zeroes the iteration
    /// counter unconditionally; a record is retired the same way whether
    /// its grade passed or its retry budget ran out. Returns the retired
    /// record's index.
    pub fn complete_active(&mut self) -> Result<usize, EngineError> {
        let index = self.active.take().ok_or(EngineError::NoActiveSection)?;
        let record = &mut self.records[index];
        record.is_written = true;
        record.is_active = false;
        record.search_iterations = 0;
        Ok(index)
    }

    /// True iff any record is still unwritten
    ///
    /// The run-completion predicate; counts non-research sections too.
    pub fn has_unwritten_sections(&self) -> bool {
        self.records.iter().any(|record| !record.is_written)
    }
}
