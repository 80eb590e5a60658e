//! Multi-file parsing of free-text LLM responses.
//!
//! Code-generation responses arrive as prose with embedded source. Parsing is
//! best-effort and staged, never failing:
//!
//! 1. fenced code blocks, with an optional path annotation in the fence info
//!    string or a leading path comment;
//! 2. when no fences exist, sections split on standalone `// path.ext`
//!    comment lines;
//! 3. nothing matched: the empty mapping, which callers turn into a
//!    single-file dump under the canonical default path.
//!
//! Blocks with no explicit path are classified by content markers (entry
//! point, test) from [`MarkerConfig`], so the heuristics stay overridable
//! instead of hard-coded.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::MarkerConfig;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^```([^\n]*)\n(.*?)^```[ \t]*$").expect("fenced block regex")
});

/// A token that plausibly names a file: no spaces, ends in an extension.
static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_\-./]*\.[A-Za-z0-9]+$").expect("path token regex")
});

/// A standalone path comment line, e.g. `// collectors/queues.go`.
static PATH_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^//\s*([A-Za-z0-9_][A-Za-z0-9_\-./]*\.[A-Za-z0-9]+)\s*$")
        .expect("path comment regex")
});

/// Stage 1: collect fenced code blocks into a path → content mapping.
///
/// The target path comes from, in order: a path-shaped token in the fence
/// info string, a path comment on the block's first line, or content
/// classification via `markers`. Empty blocks are dropped.
#[must_use]
pub fn parse_fenced_files(response: &str, markers: &MarkerConfig) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for caps in FENCED_BLOCK.captures_iter(response) {
        let info = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();
        if body.is_empty() {
            continue;
        }
        let path = annotation_from_info(info)
            .or_else(|| annotation_from_first_line(body))
            .unwrap_or_else(|| markers.classify(body).to_string());
        files.insert(path, body.to_string());
    }
    files
}

/// Stage 2: split an unfenced response on standalone path comment lines.
///
/// Each `// path.ext` line opens a new section; the marker line itself is not
/// part of the content. Text before the first marker is ignored.
#[must_use]
pub fn parse_path_comment_sections(response: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in response.lines() {
        if let Some(caps) = PATH_COMMENT.captures(line.trim_end()) {
            flush_section(&mut files, current.take());
            current = Some((caps[1].to_string(), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush_section(&mut files, current.take());
    files
}

fn flush_section(files: &mut BTreeMap<String, String>, section: Option<(String, Vec<&str>)>) {
    if let Some((path, lines)) = section {
        let content = lines.join("\n").trim().to_string();
        if !content.is_empty() {
            files.insert(path, content);
        }
    }
}

/// Full parsing pipeline: fenced blocks, then path-comment sections.
///
/// Never fails; an empty mapping signals "treat the whole response as one
/// file" to the caller.
#[must_use]
pub fn parse_source_files(response: &str, markers: &MarkerConfig) -> BTreeMap<String, String> {
    let fenced = parse_fenced_files(response, markers);
    if !fenced.is_empty() {
        return fenced;
    }
    parse_path_comment_sections(response)
}

/// Strip a single outer code fence, if present.
///
/// Research responses are requested as bare JSON but routinely arrive inside
/// a ```json fence; this peels the wrapper without touching inner content.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_fence) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some((_, body)) = after_fence.split_once('\n') else {
        return trimmed;
    };
    match body.rsplit_once("```") {
        Some((inner, _)) => inner.trim(),
        None => body.trim(),
    }
}

fn annotation_from_info(info: &str) -> Option<String> {
    info.split_whitespace()
        .find(|token| PATH_TOKEN.is_match(token))
        .map(str::to_string)
}

fn annotation_from_first_line(body: &str) -> Option<String> {
    let first_line = body.lines().find(|line| !line.trim().is_empty())?;
    PATH_COMMENT
        .captures(first_line.trim_end())
        .map(|caps| caps[1].to_string())
}
