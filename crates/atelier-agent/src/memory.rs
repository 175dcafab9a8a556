//! Persistent memory of facts about the developer and their projects.
//!
//! Facts are short natural-language strings stored in a JSON file. Each new
//! chat injects them as a context block; a duplicate predicate keeps the
//! list from accumulating restatements of the same fact.

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use atelier_core::{ChatMessage, MemoryConfig, ModelProvider, Result};

/// Judges whether a candidate fact duplicates an existing one.
///
/// Any implementation may substitute a stricter check as long as the
/// contract holds: a fact judged duplicate of an existing one is not
/// added.
pub type DuplicatePredicate = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Facts shorter than this are discarded as noise.
const MIN_FACT_CHARS: usize = 5;

/// Prefix length used by the default fuzzy duplicate match.
const FUZZY_PREFIX_CHARS: usize = 20;

/// One remembered fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFact {
    /// The fact text
    pub fact: String,
    /// When the fact was first recorded
    pub added_at: DateTime<Utc>,
    /// How many context blocks have included this fact
    pub use_count: u64,
}

/// JSON-file-backed store of developer facts.
pub struct MemoryStore {
    facts: Vec<MemoryFact>,
    path: PathBuf,
    max_facts: usize,
    is_duplicate: DuplicatePredicate,
}

impl MemoryStore {
    /// Loads the store from `path`, starting empty when the file is
    /// missing or malformed.
    pub fn load(path: PathBuf, config: &MemoryConfig) -> Self {
        let facts = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!("Ignoring malformed memory file: {error}");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };

        Self {
            facts,
            path,
            max_facts: config.max_facts,
            is_duplicate: default_duplicate_predicate(),
        }
    }

    /// Replaces the duplicate predicate.
    #[must_use]
    pub fn with_duplicate_predicate(mut self, predicate: DuplicatePredicate) -> Self {
        self.is_duplicate = predicate;
        self
    }

    /// Adds facts, skipping noise and duplicates, then trims to the cap
    /// and persists.
    pub fn add_facts(&mut self, new_facts: &[String]) {
        let now = Utc::now();
        for fact in new_facts {
            let fact = fact.trim();
            if fact.chars().count() < MIN_FACT_CHARS {
                continue;
            }
            if self
                .facts
                .iter()
                .any(|existing| (self.is_duplicate)(&existing.fact, fact))
            {
                continue;
            }
            self.facts.push(MemoryFact {
                fact: fact.to_owned(),
                added_at: now,
                use_count: 0,
            });
        }

        // Over the cap, keep the most used facts, newest first among ties.
        if self.facts.len() > self.max_facts {
            self.facts.sort_by(|first, second| {
                second
                    .use_count
                    .cmp(&first.use_count)
                    .then_with(|| second.added_at.cmp(&first.added_at))
            });
            self.facts.truncate(self.max_facts);
        }

        self.persist();
    }

    /// Adds a single fact.
    pub fn add(&mut self, fact: &str) {
        self.add_facts(&[fact.to_owned()]);
    }

    /// Formats every fact as the memory context block and bumps use
    /// counts. Returns an empty string when nothing is remembered.
    pub fn context_block(&mut self) -> String {
        if self.facts.is_empty() {
            return String::new();
        }

        for fact in &mut self.facts {
            fact.use_count += 1;
        }
        self.persist();

        let listed: Vec<String> = self
            .facts
            .iter()
            .map(|memory| format!("- {}", memory.fact))
            .collect();
        format!(
            "## What you know about this developer:\n{}",
            listed.join("\n")
        )
    }

    /// Removes the fact at `index`.
    ///
    /// # Errors
    /// Returns an error when the index is out of range.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.facts.len() {
            return Err(atelier_core::Error::Other(format!(
                "No memory at index {index}"
            )));
        }
        self.facts.remove(index);
        self.persist();
        Ok(())
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.facts.clear();
        self.persist();
    }

    /// All remembered facts, oldest first.
    pub fn all(&self) -> &[MemoryFact] {
        &self.facts
    }

    /// Number of remembered facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Writes the store to disk; memory persistence is best-effort.
    fn persist(&self) {
        let serialized = match serde_json::to_string_pretty(&self.facts) {
            Ok(serialized) => serialized,
            Err(error) => {
                warn!("Failed to serialize memories: {error}");
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && let Err(error) = fs::create_dir_all(parent)
        {
            warn!("Failed to create memory directory: {error}");
            return;
        }
        if let Err(error) = fs::write(&self.path, serialized) {
            warn!("Failed to save memories: {error}");
        }
    }
}

/// The default fuzzy match: case-folded 20-character prefix containment in
/// either direction.
pub fn default_duplicate_predicate() -> DuplicatePredicate {
    Arc::new(|existing, candidate| {
        let existing = existing.to_lowercase();
        let candidate = candidate.to_lowercase();
        let existing_prefix: String = existing.chars().take(FUZZY_PREFIX_CHARS).collect();
        let candidate_prefix: String = candidate.chars().take(FUZZY_PREFIX_CHARS).collect();
        existing.contains(&candidate_prefix) || candidate.contains(&existing_prefix)
    })
}

/// Distills 0-3 short facts worth remembering from one conversation turn.
///
/// Extraction is non-critical: any provider or parse failure yields an
/// empty list and a debug log, never an error to the caller.
pub async fn extract_facts<P: ModelProvider + ?Sized>(
    provider: &P,
    user_message: &str,
    assistant_response: &str,
) -> Vec<String> {
    let prompt = format!(
        "You are analyzing a coding assistant conversation to extract useful memories \
         about the user's preferences, project details, and coding patterns.\n\n\
         User said: \"{}\"\n\
         Assistant responded with: \"{}\"\n\n\
         Extract 0-3 SHORT, specific, factual memories worth remembering for future \
         conversations. Focus on tech stack preferences, project-specific facts, coding \
         style preferences, recurring topics, and things to avoid.\n\n\
         Return ONLY a JSON array of strings. Return [] if the conversation doesn't \
         reveal anything memorable.",
        truncate(user_message, 500),
        truncate(assistant_response, 800),
    );

    let mut stream = match provider.generate("", &[ChatMessage::user(prompt)]).await {
        Ok(stream) => stream,
        Err(error) => {
            debug!("Memory extraction skipped: {error}");
            return Vec::new();
        }
    };

    let mut response = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => response.push_str(&text),
            Err(error) => {
                debug!("Memory extraction stream failed: {error}");
                return Vec::new();
            }
        }
    }

    parse_fact_array(&response)
}

/// Pulls the first JSON array out of a model response.
fn parse_fact_array(response: &str) -> Vec<String> {
    let Ok(array_pattern) = Regex::new(r"(?s)\[.*\]") else {
        return Vec::new();
    };
    let Some(found) = array_pattern.find(response) else {
        return Vec::new();
    };
    serde_json::from_str(found.as_str()).unwrap_or_default()
}

/// Character-bounded truncation for prompt excerpts.
fn truncate(text: &str, max_chars: usize) -> String {
    atelier_core::truncate_chars(text, max_chars).into_owned()
}
