//! Prompt-caching layout for the system prompt
//!
//! Long system prompts are split into at most [`MAX_SYSTEM_SEGMENTS`]
//! segments at paragraph boundaries so stable prefixes can be cached
//! independently of trailing edits. Paragraphs are distributed as evenly
//! as possible and never reordered; every segment after the first carries
//! an ephemeral `cache_control` marker.

use super::types::{CacheControl, SystemSegment};

pub(super) const MAX_SYSTEM_SEGMENTS: usize = 3;

/// Split a system prompt into cacheable segments.
///
/// With caching disabled the prompt stays a single unmarked segment.
pub(super) fn segment_system_prompt(prompt: &str, enable_caching: bool) -> Vec<SystemSegment> {
    if !enable_caching {
        return vec![SystemSegment::text(prompt)];
    }

    let paragraphs: Vec<&str> = prompt
        .split("\n\n")
        .map(str::trim_end)
        .filter(|p| !p.trim().is_empty())
        .collect();
    if paragraphs.is_empty() {
        return vec![SystemSegment::text(prompt)];
    }

    let segment_count = paragraphs.len().min(MAX_SYSTEM_SEGMENTS);
    let base = paragraphs.len() / segment_count;
    let remainder = paragraphs.len() % segment_count;

    let mut segments = Vec::with_capacity(segment_count);
    let mut cursor = 0;
    for index in 0..segment_count {
        // Front-load the remainder so sizes differ by at most one
        let size = base + usize::from(index < remainder);
        let text = paragraphs[cursor..cursor + size].join("\n\n");
        cursor += size;

        let mut segment = SystemSegment::text(text);
        if index > 0 {
            segment.cache_control = Some(CacheControl::ephemeral());
        }
        segments.push(segment);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_of(paragraphs: &[&str]) -> String {
        paragraphs.join("\n\n")
    }

    #[test]
    fn short_prompt_stays_whole() {
        let segments = segment_system_prompt("You are terse.", true);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].cache_control.is_none());
    }

    #[test]
    fn caps_at_three_segments() {
        let prompt = prompt_of(&["a", "b", "c", "d", "e", "f", "g"]);
        let segments = segment_system_prompt(&prompt, true);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn distributes_paragraphs_evenly() {
        let prompt = prompt_of(&["p1", "p2", "p3", "p4", "p5", "p6", "p7"]);
        let segments = segment_system_prompt(&prompt, true);
        let sizes: Vec<usize> = segments
            .iter()
            .map(|s| s.text.split("\n\n").count())
            .collect();
        assert_eq!(sizes, vec![3, 2, 2]);
    }

    #[test]
    fn preserves_paragraph_order() {
        let prompt = prompt_of(&["first", "second", "third", "fourth"]);
        let segments = segment_system_prompt(&prompt, true);
        let rejoined = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        assert_eq!(rejoined, prompt);
    }

    #[test]
    fn cache_control_on_every_segment_after_the_first() {
        let prompt = prompt_of(&["a", "b", "c"]);
        let segments = segment_system_prompt(&prompt, true);
        assert!(segments[0].cache_control.is_none());
        assert!(segments[1..]
            .iter()
            .all(|s| s.cache_control.is_some()));
    }

    #[test]
    fn caching_disabled_means_one_unmarked_segment() {
        let prompt = prompt_of(&["a", "b", "c", "d"]);
        let segments = segment_system_prompt(&prompt, false);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].cache_control.is_none());
        assert_eq!(segments[0].text, prompt);
    }
}
