// Repository list view state.
// Filtering, sorting and display paging over the accumulated records.

use std::cmp::Ordering;

use crate::github::Repository;

/// Rows shown per display page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Sortable column of the repository table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Stars,
    Forks,
    Language,
    Description,
    PushedAt,
}

impl SortColumn {
    fn compare(&self, a: &Repository, b: &Repository) -> Ordering {
        match self {
            SortColumn::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortColumn::Stars => a.stars.cmp(&b.stars),
            SortColumn::Forks => a.forks.cmp(&b.forks),
            SortColumn::Language => lower(&a.language).cmp(&lower(&b.language)),
            SortColumn::Description => lower(&a.description).cmp(&lower(&b.description)),
            SortColumn::PushedAt => a.pushed_at.cmp(&b.pushed_at),
        }
    }
}

fn lower(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().to_lowercase()
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub descending: bool,
}

/// Filtered, sorted and paged view over a record buffer.
///
/// Holds indices into the buffer owned by the caller, so appending records
/// only requires a `refilter`.
#[derive(Debug, Clone)]
pub struct RepoView {
    filter: String,
    sort: Option<SortState>,
    visible: Vec<usize>,
    current_page: usize,
    page_size: usize,
    selected: Option<String>,
}

impl Default for RepoView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl RepoView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: String::new(),
            sort: None,
            visible: Vec::new(),
            current_page: 0,
            page_size: page_size.max(1),
            selected: None,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of records passing the filter.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Total display pages, never less than one.
    pub fn total_pages(&self) -> usize {
        self.visible.len().div_ceil(self.page_size).max(1)
    }

    /// Recompute the visible rows from `records`.
    ///
    /// With `reset_page` false the current page is kept (clamped to the new
    /// page count), so rows arriving incrementally do not move the viewer.
    pub fn refilter(&mut self, records: &[Repository], reset_page: bool) {
        let needle = self.filter.to_lowercase();
        self.visible = records
            .iter()
            .enumerate()
            .filter(|(_, r)| needle.is_empty() || r.name.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();

        if let Some(sort) = self.sort {
            self.apply_sort(records, sort);
        }

        if reset_page {
            self.current_page = 0;
        } else {
            self.current_page = self.current_page.min(self.total_pages() - 1);
        }
    }

    /// Replace the name filter (case-insensitive substring) and go to page one.
    pub fn set_filter(&mut self, records: &[Repository], filter: &str) {
        self.filter = filter.trim().to_string();
        self.refilter(records, true);
    }

    /// Sort by `column`. Choosing the same column again flips the direction.
    pub fn sort_by(&mut self, records: &[Repository], column: SortColumn) {
        let descending = matches!(self.sort, Some(s) if s.column == column && !s.descending);
        let sort = SortState { column, descending };
        self.sort = Some(sort);
        self.apply_sort(records, sort);
        self.current_page = 0;
    }

    fn apply_sort(&mut self, records: &[Repository], sort: SortState) {
        self.visible.sort_by(|&a, &b| {
            let ordering = sort.column.compare(&records[a], &records[b]);
            if sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.total_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Rows on the current display page.
    pub fn page_items<'a>(&self, records: &'a [Repository]) -> Vec<&'a Repository> {
        self.visible
            .iter()
            .skip(self.current_page * self.page_size)
            .take(self.page_size)
            .filter_map(|&i| records.get(i))
            .collect()
    }

    /// All rows passing the filter, in display order.
    pub fn visible_items<'a>(&self, records: &'a [Repository]) -> Vec<&'a Repository> {
        self.visible.iter().filter_map(|&i| records.get(i)).collect()
    }

    /// Select a row by repository name. Survives refilters while the row stays visible.
    pub fn select(&mut self, name: &str) {
        self.selected = Some(name.to_string());
    }

    pub fn selected<'a>(&self, records: &'a [Repository]) -> Option<&'a Repository> {
        let name = self.selected.as_deref()?;
        self.visible
            .iter()
            .filter_map(|&i| records.get(i))
            .find(|r| r.name == name)
    }

    /// Status line such as `Page 1/4 | Displaying 80 of 95 loaded repos.`
    pub fn summary(&self, loaded: usize) -> String {
        format!(
            "Page {}/{} | Displaying {} of {} loaded repos.",
            self.current_page + 1,
            self.total_pages(),
            self.visible.len(),
            loaded
        )
    }

    /// Forget filter, sort, paging and selection.
    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }
}
