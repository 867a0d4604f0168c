//! Pattern-based moderation filter.

use std::path::Path;

use log::{info, warn};
use regex::{Regex, RegexBuilder};

/// Decides whether a message text must be dropped before delivery.
pub trait ModerationFilter: Send + Sync {
    fn is_filtered(&self, text: &str) -> bool;
}

/// Filter that never drops anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl ModerationFilter for AllowAll {
    fn is_filtered(&self, _text: &str) -> bool {
        false
    }
}

/// Case-insensitive regex patterns; a message is filtered if any pattern matches.
#[derive(Debug, Default, Clone)]
pub struct PatternFilter {
    patterns: Vec<Regex>,
}

impl PatternFilter {
    /// Compile a newline-delimited pattern list.
    ///
    /// Blank lines and `#` comments are ignored. Patterns that fail to compile
    /// are skipped with a warning.
    pub fn from_patterns(list: &str) -> Self {
        let mut patterns = Vec::new();
        for line in list.lines() {
            let pattern = line.trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => patterns.push(re),
                Err(e) => warn!("Failed to compile moderation pattern {:?}: {}", pattern, e),
            }
        }
        if patterns.is_empty() {
            warn!("No valid moderation patterns loaded");
        }
        Self { patterns }
    }

    /// Load patterns from a file.
    ///
    /// An unreadable file yields an empty filter; moderation is degraded but the
    /// server keeps running.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let filter = Self::from_patterns(&contents);
                info!(
                    "Loaded {} moderation pattern(s) from {}",
                    filter.len(),
                    path.display()
                );
                filter
            }
            Err(e) => {
                warn!(
                    "Failed to read moderation patterns from {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl ModerationFilter for PatternFilter {
    fn is_filtered(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}
