//! Web research for queries that need current information.
//!
//! A fixed trigger list decides whether a query warrants research; findings
//! come from the DuckDuckGo Instant Answer API plus npm and PyPI registry
//! lookups for package names mentioned in the query. Every network failure
//! degrades to empty findings — research never blocks a chat.

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use atelier_core::Result;

/// Terms suggesting the user wants or needs current web information.
pub const RESEARCH_TRIGGERS: &[&str] = &[
    "how to",
    "how do i",
    "what is",
    "install",
    "npm install",
    "pip install",
    "error:",
    "exception:",
    "cannot find",
    "doesn't work",
    "not working",
    "latest version",
    "best way",
    "best practice",
    "tutorial",
    "example",
    "documentation",
    "docs",
    "api",
    "library",
    "package",
    "framework",
    " vs ",
    "compare",
    "difference between",
    "alternatives to",
    "deprecated",
    "vulnerability",
    "cve-",
    "breaking change",
];

/// Per-request timeout for research lookups.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Maximum deduplicated web results kept.
const MAX_WEB_RESULTS: usize = 6;

/// Maximum package lookups per query.
const MAX_PACKAGE_LOOKUPS: usize = 2;

/// Whether a query warrants a web research pass.
pub fn should_research(query: &str) -> bool {
    let lowered = query.to_lowercase();
    RESEARCH_TRIGGERS
        .iter()
        .any(|trigger| lowered.contains(trigger))
}

/// One web search hit.
#[derive(Debug, Clone)]
pub struct WebResult {
    /// Result title
    pub title: String,
    /// Short excerpt
    pub snippet: String,
    /// Source URL, possibly empty for instant answers
    pub url: String,
}

/// Registry metadata for a package mentioned in the query.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Package name
    pub name: String,
    /// Latest published version
    pub version: String,
    /// One-line description
    pub description: String,
    /// Documentation or homepage URL
    pub homepage: String,
    /// Registry the package came from (`npm` or `pypi`)
    pub registry: &'static str,
}

/// Findings gathered for one query.
#[derive(Debug, Clone, Default)]
pub struct ResearchFindings {
    /// Deduplicated web results
    pub web_results: Vec<WebResult>,
    /// Resolved package metadata
    pub package_info: Vec<PackageInfo>,
}

/// Progress callback invoked with short status messages.
pub type ResearchProgress<'observer> = &'observer (dyn Fn(&str) + Send + Sync);

/// Client for the research lookups.
pub struct ResearchClient {
    client: Client,
}

impl ResearchClient {
    /// Creates a client with the research timeout applied.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Gathers findings for a query.
    ///
    /// Individual lookup failures are logged and skipped; the returned
    /// findings may be partial or empty but this never fails.
    pub async fn research(
        &self,
        query: &str,
        on_progress: Option<ResearchProgress<'_>>,
    ) -> ResearchFindings {
        let mut findings = ResearchFindings::default();

        if let Some(report) = on_progress {
            report("Searching the web...");
        }

        for search_query in generate_search_queries(query) {
            match self.ddg_search(&search_query).await {
                Ok(results) => findings.web_results.extend(results),
                Err(error) => debug!("Web search failed for {search_query:?}: {error}"),
            }
        }
        dedup_by_url(&mut findings.web_results);
        findings.web_results.truncate(MAX_WEB_RESULTS);

        for (name, registry) in extract_package_names(query)
            .into_iter()
            .take(MAX_PACKAGE_LOOKUPS)
        {
            if let Some(report) = on_progress {
                report(&format!("Looking up {name}..."));
            }
            let lookup = match registry {
                "npm" => self.npm_lookup(&name).await,
                _ => self.pypi_lookup(&name).await,
            };
            match lookup {
                Ok(info) => findings.package_info.push(info),
                Err(error) => debug!("Package lookup failed for {name}: {error}"),
            }
        }

        findings
    }

    /// Queries the DuckDuckGo Instant Answer API (free, no key needed).
    async fn ddg_search(&self, query: &str) -> Result<Vec<WebResult>> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencode(query)
        );
        let payload: Value = self.client.get(url).send().await?.json().await?;

        let mut results = Vec::new();

        // The abstract is the main answer, when one exists.
        let abstract_text = payload["AbstractText"].as_str().unwrap_or_default();
        if !abstract_text.is_empty() {
            results.push(WebResult {
                title: payload["Heading"]
                    .as_str()
                    .filter(|heading| !heading.is_empty())
                    .unwrap_or(query)
                    .to_owned(),
                snippet: abstract_text.to_owned(),
                url: payload["AbstractURL"].as_str().unwrap_or_default().to_owned(),
            });
        }

        if let Some(topics) = payload["RelatedTopics"].as_array() {
            for topic in topics.iter().take(4) {
                let text = topic["Text"].as_str().unwrap_or_default();
                let first_url = topic["FirstURL"].as_str().unwrap_or_default();
                if !text.is_empty() && !first_url.is_empty() {
                    results.push(WebResult {
                        title: text.split(" - ").next().unwrap_or(text).to_owned(),
                        snippet: text.to_owned(),
                        url: first_url.to_owned(),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Resolves a package against the npm registry.
    async fn npm_lookup(&self, package: &str) -> Result<PackageInfo> {
        let url = format!("https://registry.npmjs.org/{package}/latest");
        let payload: Value = self.client.get(url).send().await?.json().await?;

        Ok(PackageInfo {
            name: payload["name"].as_str().unwrap_or(package).to_owned(),
            version: payload["version"].as_str().unwrap_or_default().to_owned(),
            description: payload["description"].as_str().unwrap_or_default().to_owned(),
            homepage: payload["homepage"]
                .as_str()
                .filter(|homepage| !homepage.is_empty())
                .map_or_else(
                    || format!("https://npmjs.com/package/{package}"),
                    ToOwned::to_owned,
                ),
            registry: "npm",
        })
    }

    /// Resolves a package against PyPI.
    async fn pypi_lookup(&self, package: &str) -> Result<PackageInfo> {
        let url = format!("https://pypi.org/pypi/{package}/json");
        let payload: Value = self.client.get(url).send().await?.json().await?;
        let info = &payload["info"];

        Ok(PackageInfo {
            name: info["name"].as_str().unwrap_or(package).to_owned(),
            version: info["version"].as_str().unwrap_or_default().to_owned(),
            description: info["summary"].as_str().unwrap_or_default().to_owned(),
            homepage: info["home_page"]
                .as_str()
                .filter(|homepage| !homepage.is_empty())
                .map_or_else(
                    || format!("https://pypi.org/project/{package}"),
                    ToOwned::to_owned,
                ),
            registry: "pypi",
        })
    }
}

impl Default for ResearchClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands a coding question into at most two search queries.
fn generate_search_queries(query: &str) -> Vec<String> {
    let mut queries = vec![query.to_owned()];

    let lowered = query.to_lowercase();
    if lowered.contains("error:") || lowered.contains("exception") {
        queries.push(format!("fix: {}", excerpt(query, 100)));
    } else if lowered.contains("how to") || lowered.contains("how do") {
        queries.push(format!("{query} example code"));
    }

    queries.truncate(2);
    queries
}

/// Extracts `(package, registry)` pairs mentioned in the query.
fn extract_package_names(query: &str) -> Vec<(String, &'static str)> {
    let mut packages = Vec::new();

    if let Ok(npm_pattern) =
        Regex::new(r"(?i)(?:npm install|require)\s+([a-z@][a-z0-9\-@/.]*)")
    {
        for capture in npm_pattern.captures_iter(query) {
            if let Some(name) = capture.get(1) {
                packages.push((name.as_str().to_owned(), "npm"));
            }
        }
    }

    if let Ok(pip_pattern) = Regex::new(r"(?i)(?:pip install|import)\s+([a-z][a-z0-9\-_]*)") {
        for capture in pip_pattern.captures_iter(query) {
            if let Some(name) = capture.get(1) {
                packages.push((name.as_str().to_owned(), "pypi"));
            }
        }
    }

    packages
}

/// Drops repeat URLs, keeping first occurrences in order.
fn dedup_by_url(results: &mut Vec<WebResult>) {
    let mut seen = HashSet::new();
    results.retain(|result| seen.insert(result.url.clone()));
}

/// Formats findings as a context block for the system prompt.
pub fn format_research_context(findings: &ResearchFindings) -> String {
    let mut parts = Vec::new();

    if !findings.package_info.is_empty() {
        parts.push("## Package Info".to_owned());
        for package in &findings.package_info {
            parts.push(format!(
                "**{}** v{} ({})\n{}\nDocs: {}",
                package.name, package.version, package.registry, package.description,
                package.homepage
            ));
        }
    }

    if !findings.web_results.is_empty() {
        parts.push("## Web Research".to_owned());
        for result in findings.web_results.iter().take(4) {
            if result.snippet.is_empty() {
                continue;
            }
            let source = if result.url.is_empty() {
                String::new()
            } else {
                format!("\n_Source: {}_", result.url)
            };
            parts.push(format!("**{}**\n{}{}", result.title, result.snippet, source));
        }
    }

    parts.join("\n\n")
}

/// Minimal percent-encoding for query strings.
fn urlencode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            b' ' => encoded.push('+'),
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
        }
    }
    encoded
}

/// Character-bounded excerpt of a query.
fn excerpt(text: &str, max_chars: usize) -> String {
    atelier_core::truncate_chars(text, max_chars).into_owned()
}
