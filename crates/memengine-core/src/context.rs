//! Context assembly (C7)
//!
//! Pure string concatenation gluing together the prompt fragments every
//! other component already knows how to build. The engine exposes this so
//! hosts that want the defaults don't have to re-derive the ordering, but
//! nothing here is mandatory — callers may inline the same fragments in a
//! different arrangement.

use crate::error::Result;
use crate::storage::Store;

const TOOL_INSTRUCTION_SUFFIX: &str =
    "## Tool Use\n\n\
     Use the memory tools to keep this context accurate: write durable facts \
     as soon as they're established, read a block before editing it, and \
     prefer archival search over asking the user to repeat themselves.";

impl Store {
    /// Concatenate, in order: `persona_prompt`, the KV fragment, the core
    /// block fragment, the summary-ladder fragment (loaded fresh), and the
    /// fixed tool-instruction suffix. Sections that are empty contribute
    /// nothing but their own trailing separator.
    pub fn assemble_prompt(&self, persona_prompt: &str) -> Result<String> {
        let kv_fragment = self.kv_build_prompt_fragment();
        let core_fragment = self.build_core_prompt_fragment()?;
        let loaded_summaries = self.load_for_context()?;
        let summary_fragment = self.build_summary_prompt_fragment(&loaded_summaries);

        let mut sections = vec![persona_prompt.to_string()];
        for fragment in [kv_fragment, core_fragment, summary_fragment] {
            if !fragment.is_empty() {
                sections.push(fragment);
            }
        }
        sections.push(TOOL_INSTRUCTION_SUFFIX.to_string());

        Ok(sections.join("\n\n"))
    }
}
