//! Statement matching against a frozen snapshot
//!
//! The matcher only ever answers "first", never "best": when several sessions
//! contain the fragment, the earliest one in server order wins and the caller
//! has to pass a more specific fragment to pick another.

use super::error::ArgumentError;
use super::session::{SessionRecord, Snapshot};

/// Normalized search fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    raw: String,
    fragment: String,
    case_sensitive: bool,
}

impl MatchCriteria {
    /// Build criteria from raw caller input.
    ///
    /// Trailing whitespace and then one trailing `;` are dropped. The fragment
    /// must not be empty afterwards.
    pub fn new(raw: &str, case_sensitive: bool) -> Result<Self, ArgumentError> {
        let trimmed = raw.trim_end();
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);

        if trimmed.trim().is_empty() {
            return Err(ArgumentError::EmptyFragment);
        }

        let fragment = if case_sensitive {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        };

        Ok(Self {
            raw: raw.to_string(),
            fragment,
            case_sensitive,
        })
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Input exactly as the caller gave it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Substring containment, folded per the configured case mode
    pub fn matches(&self, text: &str) -> bool {
        if self.case_sensitive {
            text.contains(&self.fragment)
        } else {
            text.to_lowercase().contains(&self.fragment)
        }
    }
}

/// Selects at most one session from a snapshot
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    criteria: MatchCriteria,
    listing_statement: String,
}

impl QueryMatcher {
    /// `listing_statement` is the statement the source used to produce the
    /// snapshot; sessions running it are never eligible.
    pub fn new(criteria: MatchCriteria, listing_statement: &str) -> Self {
        Self {
            criteria,
            listing_statement: canonical_statement(listing_statement),
        }
    }

    /// First eligible session in snapshot order
    pub fn find<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a SessionRecord> {
        snapshot.records().iter().find(|record| self.is_eligible(record))
    }

    fn is_eligible(&self, record: &SessionRecord) -> bool {
        if !record.is_executing() {
            return false;
        }
        let Some(text) = record.info.as_deref() else {
            return false;
        };
        self.criteria.matches(text) && !self.is_listing(text)
    }

    fn is_listing(&self, text: &str) -> bool {
        let canonical = canonical_statement(text);
        canonical == self.listing_statement
            || canonical.starts_with("show full processlist")
            || canonical.starts_with("show processlist")
    }
}

/// Lowercased, whitespace-collapsed statement without a trailing `;`
fn canonical_statement(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.strip_suffix(';').unwrap_or(&collapsed).trim_end();
    collapsed.to_lowercase()
}
