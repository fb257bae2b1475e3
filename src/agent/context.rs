//! Context assembly for answer synthesis.
//!
//! Turns accumulated evidence into a bounded block of text. Truncation is
//! purely length-based, so the output is a deterministic function of the
//! inputs.

use std::fmt::Write;

/// Items taken from each source by default.
pub const DEFAULT_MAX_ITEMS: usize = 3;
/// Characters kept per item by default.
pub const DEFAULT_MAX_CHARS: usize = 500;
/// Appended to an item that was cut at the character budget.
pub const TRUNCATION_MARKER: &str = "...";
/// Returned when neither source contributed anything.
pub const NO_CONTEXT: &str = "No additional context available.";

const LOCAL_HEADER: &str = "## Local Knowledge Base:";
const WEB_HEADER: &str = "## Web Search Results:";

/// Size limits applied per source section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Maximum items per section.
    pub max_items: usize,
    /// Maximum characters per item (Unicode scalar values).
    pub max_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Builds the context block handed to the synthesizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextAssembler {
    limits: ContextLimits,
}

impl ContextAssembler {
    /// Creates an assembler with the given limits.
    #[must_use]
    pub const fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    /// Configured limits.
    #[must_use]
    pub const fn limits(&self) -> ContextLimits {
        self.limits
    }

    /// Assembles the context from local documents and web results.
    ///
    /// A section is emitted only when its source produced at least one item.
    /// Absent and empty sources are treated alike here.
    #[must_use]
    pub fn assemble(
        &self,
        retrieved_docs: Option<&[String]>,
        web_results: Option<&[String]>,
    ) -> String {
        let mut context = String::new();

        if let Some(docs) = retrieved_docs.filter(|d| !d.is_empty()) {
            self.push_section(&mut context, LOCAL_HEADER, docs);
        }
        if let Some(results) = web_results.filter(|r| !r.is_empty()) {
            if !context.is_empty() {
                context.push_str("\n\n");
            }
            self.push_section(&mut context, WEB_HEADER, results);
        }

        if context.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            context
        }
    }

    fn push_section(&self, out: &mut String, header: &str, items: &[String]) {
        out.push_str(header);
        for (i, item) in items.iter().take(self.limits.max_items).enumerate() {
            let _ = write!(out, "\n{}. {}", i + 1, truncate(item, self.limits.max_chars));
        }
    }
}

/// Cuts `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// only when something was removed.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_sources_returns_sentinel() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.assemble(None, None), NO_CONTEXT);
        assert_eq!(assembler.assemble(Some(&[][..]), Some(&[][..])), NO_CONTEXT);
    }

    #[test]
    fn test_local_section_only() {
        let assembler = ContextAssembler::default();
        let local = docs(&["Diversification spreads risk.", "Asset allocation matters."]);
        let context = assembler.assemble(Some(local.as_slice()), None);
        assert_eq!(
            context,
            "## Local Knowledge Base:\n1. Diversification spreads risk.\n2. Asset allocation matters."
        );
        assert!(!context.contains(WEB_HEADER));
    }

    #[test]
    fn test_both_sections_in_order() {
        let assembler = ContextAssembler::default();
        let local = docs(&["local"]);
        let web = docs(&["web"]);
        let context = assembler.assemble(Some(local.as_slice()), Some(web.as_slice()));
        assert_eq!(
            context,
            "## Local Knowledge Base:\n1. local\n\n## Web Search Results:\n1. web"
        );
    }

    #[test]
    fn test_web_section_alone_has_no_leading_blank_line() {
        let assembler = ContextAssembler::default();
        let web = docs(&["web"]);
        let context = assembler.assemble(Some(&[][..]), Some(web.as_slice()));
        assert_eq!(context, "## Web Search Results:\n1. web");
    }

    #[test]
    fn test_caps_items_per_section() {
        let assembler = ContextAssembler::default();
        let web = docs(&["a", "b", "c", "d", "e"]);
        let context = assembler.assemble(None, Some(web.as_slice()));
        assert!(context.contains("3. c"));
        assert!(!context.contains("4. d"));
    }

    #[test]
    fn test_truncates_long_items() {
        let assembler = ContextAssembler::new(ContextLimits {
            max_items: 3,
            max_chars: 5,
        });
        let local = docs(&["abcdefgh", "abcde"]);
        let context = assembler.assemble(Some(local.as_slice()), None);
        assert!(context.contains("1. abcde..."));
        assert!(context.contains("2. abcde\n") || context.ends_with("2. abcde"));
    }

    #[test]
    fn test_truncate_is_char_based() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("€€€", 3), "€€€");
        assert_eq!(truncate("", 0), "");
        assert_eq!(truncate("x", 0), "...");
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let assembler = ContextAssembler::default();
        let long = "x".repeat(800);
        let local = docs(&["one", long.as_str()]);
        let web = docs(&["two"]);
        let first = assembler.assemble(Some(local.as_slice()), Some(web.as_slice()));
        let second = assembler.assemble(Some(local.as_slice()), Some(web.as_slice()));
        assert_eq!(first, second);
    }
}
