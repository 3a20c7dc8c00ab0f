//! Read-time estimation

use crate::content::ContentSection;

/// Default reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace separated tokens
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words in every heading and every body block of a post
pub fn total_words(content: &[ContentSection]) -> usize {
    content
        .iter()
        .map(|section| {
            count_words(&section.heading)
                + section
                    .body
                    .iter()
                    .map(|block| count_words(&block.text))
                    .sum::<usize>()
        })
        .sum()
}

/// Estimated minutes to read, rounded up
pub fn read_time(content: &[ContentSection], words_per_minute: usize) -> usize {
    total_words(content).div_ceil(words_per_minute.max(1))
}
