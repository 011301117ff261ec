// Aggregate statistics over a completed listing.
// Computed once per session when the final page has arrived.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};

use crate::github::Repository;

const TOP_N: usize = 10;
const ACTIVITY_MONTHS: u32 = 12;

/// Summary figures for an account's repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Insights {
    pub total_repos: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    /// Most used languages with their repository counts, largest first.
    pub top_languages: Vec<(String, usize)>,
    /// Most starred repositories, largest first.
    pub top_starred: Vec<(String, u64)>,
    /// Repositories last pushed in each of the trailing months, oldest first,
    /// labelled `YYYY-MM`.
    pub monthly_pushes: Vec<(String, usize)>,
}

impl Insights {
    pub fn compute(records: &[Repository], now: DateTime<Utc>) -> Self {
        let mut languages: HashMap<&str, usize> = HashMap::new();
        for repo in records {
            *languages
                .entry(repo.language.as_deref().unwrap_or("Unknown"))
                .or_default() += 1;
        }
        let mut top_languages: Vec<(String, usize)> = languages
            .into_iter()
            .map(|(lang, count)| (lang.to_string(), count))
            .collect();
        top_languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_languages.truncate(TOP_N);

        let mut starred: Vec<&Repository> = records.iter().collect();
        starred.sort_by(|a, b| b.stars.cmp(&a.stars));
        let top_starred = starred
            .into_iter()
            .take(TOP_N)
            .map(|r| (r.name.clone(), r.stars))
            .collect();

        Self {
            total_repos: records.len(),
            total_stars: records.iter().map(|r| r.stars).sum(),
            total_forks: records.iter().map(|r| r.forks).sum(),
            top_languages,
            top_starred,
            monthly_pushes: monthly_pushes(records, now),
        }
    }
}

/// Most recent push across all records.
pub fn last_activity(records: &[Repository]) -> Option<DateTime<Utc>> {
    records.iter().filter_map(|r| r.pushed_at).max()
}

fn monthly_pushes(records: &[Repository], now: DateTime<Utc>) -> Vec<(String, usize)> {
    let months = trailing_months(now.year(), now.month(), ACTIVITY_MONTHS);
    let mut counts: HashMap<(i32, u32), usize> = HashMap::new();
    for pushed in records.iter().filter_map(|r| r.pushed_at) {
        *counts.entry((pushed.year(), pushed.month())).or_default() += 1;
    }

    months
        .into_iter()
        .map(|(year, month)| {
            (
                format!("{:04}-{:02}", year, month),
                counts.get(&(year, month)).copied().unwrap_or(0),
            )
        })
        .collect()
}

/// The `count` months ending with (`year`, `month`), oldest first.
fn trailing_months(year: i32, month: u32, count: u32) -> Vec<(i32, u32)> {
    let end = year * 12 + month as i32 - 1;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = end - back;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}
