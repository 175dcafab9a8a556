//! Assembles the context block injected into generation system prompts.

use atelier_core::{FileContext, truncate_chars};

/// Maximum characters of open-file content carried into the context.
const FILE_CONTEXT_CAP: usize = 8000;

/// Merges the context parts into one block, in fixed order: memory facts,
/// open-file content, retrieved code, research findings.
///
/// Empty parts are omitted entirely. This is a pure function of its
/// inputs; the collaborators that produce each part own all IO.
pub fn assemble_context(
    memory_block: &str,
    file_context: Option<&FileContext>,
    retrieval_block: &str,
    research_block: &str,
) -> String {
    let file_block = file_context.map_or_else(String::new, |file| {
        format!(
            "## Current file: {}\n```\n{}\n```",
            file.path.display(),
            truncate_chars(&file.content, FILE_CONTEXT_CAP)
        )
    });

    [memory_block, &file_block, retrieval_block, research_block]
        .iter()
        .copied()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parts_appear_in_fixed_order() {
        let file = FileContext::new(PathBuf::from("src/main.rs"), "fn main() {}".to_owned());
        let block = assemble_context(
            "## What you know about this developer:\n- prefers Rust",
            Some(&file),
            "## Relevant code from your codebase:\n\n### a.rs",
            "## Web Research\nfindings",
        );

        let memory_at = block.find("What you know").unwrap_or(usize::MAX);
        let file_at = block.find("Current file").unwrap_or(usize::MAX);
        let retrieval_at = block.find("Relevant code").unwrap_or(usize::MAX);
        let research_at = block.find("Web Research").unwrap_or(usize::MAX);
        assert!(memory_at < file_at);
        assert!(file_at < retrieval_at);
        assert!(retrieval_at < research_at);
    }

    #[test]
    fn empty_parts_are_omitted() {
        let block = assemble_context("", None, "## Relevant code", "");
        assert_eq!(block, "## Relevant code");

        assert!(assemble_context("", None, "", "").is_empty());
    }

    #[test]
    fn file_content_is_truncated_and_tagged() {
        let file = FileContext::new(PathBuf::from("big.py"), "y".repeat(20_000));
        let block = assemble_context("", Some(&file), "", "");

        assert!(block.starts_with("## Current file: big.py\n```\n"));
        assert!(block.len() < 9000, "Open-file content must be capped");
    }
}
