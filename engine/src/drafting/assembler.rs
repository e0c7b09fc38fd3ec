//! Proposal Assembler
//!
//! Accumulates committed section content into the final proposal text.
//! Every append is prefixed with a blank line, the first one included,
//! so assembly is pure concatenation and reassembling the same sections
//! always yields byte-identical output.

use crate::drafting::registry::SectionRegistry;

#[derive(Debug, Clone, Default)]
pub struct ProposalAssembler {
    assembled: String,
    sections: usize,
}

impl ProposalAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one committed section's content
    pub fn append(&mut self, content: &str) {
        self.assembled.push_str("\n\n");
        self.assembled.push_str(content);
        self.sections += 1;
    }

    /// The proposal text assembled so far
    pub fn assembled(&self) -> &str {
        &self.assembled
    }

    /// Number of sections appended so far
    pub fn sections(&self) -> usize {
        self.sections
    }

    /// Consume the assembler, yielding the final text
    pub fn into_text(self) -> String {
        self.assembled
    }

    /// Whether every section in the registry has been written
    pub fn is_complete(registry: &SectionRegistry) -> bool {
        !registry.has_unwritten_sections()
    }
}
