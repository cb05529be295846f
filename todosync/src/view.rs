//! View projection: the filtered, searched and paginated slice of the task
//! list, plus summary counters.
//!
//! Everything here is a pure function of the task list and UI-only
//! parameters. [`ViewState`] holds those parameters and applies the page
//! reset rules when they change.

use todosync_proto::{Filter, Task};

/// Page sizes offered to the user.
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 20, 50];

/// Page size used until the user picks another.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Search text and pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    /// Case-insensitive title substring; blank means no search.
    pub search: String,
    /// 1-based page index.
    pub page_index: usize,
    /// Tasks per page.
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page_index: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of the projected list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Tasks on this page, in list order.
    pub items: Vec<Task>,
    /// Number of tasks matching the filter and search across all pages.
    pub total: usize,
    /// 1-based page index this page was cut at.
    pub page_index: usize,
    /// Page size this page was cut with.
    pub page_size: usize,
}

impl Page {
    /// Number of pages needed to show every matching task (at least 1).
    #[must_use]
    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }
}

/// Counters over a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// All tasks.
    pub total: usize,
    /// Tasks with `completed == true`.
    pub completed: usize,
    /// Tasks with `completed == false`.
    pub pending: usize,
}

/// Returns `true` if `task` passes `filter` and its title contains `needle`.
///
/// `needle` must already be trimmed and lowercased; an empty needle
/// matches every title.
fn matches(task: &Task, filter: Filter, needle: &str) -> bool {
    filter.matches(task) && (needle.is_empty() || task.title.to_lowercase().contains(needle))
}

/// Projects `tasks` through `filter` and `query`.
///
/// `total` counts every match; `items` holds the window
/// `[(page_index - 1) * page_size, page_index * page_size)`. A page index
/// of 0 is treated as 1 and a page size of 0 yields no items.
#[must_use]
pub fn project(tasks: &[Task], filter: Filter, query: &ViewQuery) -> Page {
    let needle = query.search.trim().to_lowercase();
    let page_index = query.page_index.max(1);
    let start = (page_index - 1).saturating_mul(query.page_size);

    let mut total = 0;
    let mut items = Vec::new();
    for task in tasks.iter().filter(|t| matches(t, filter, &needle)) {
        if total >= start && items.len() < query.page_size {
            items.push(task.clone());
        }
        total += 1;
    }

    Page {
        items,
        total,
        page_index,
        page_size: query.page_size,
    }
}

/// Counts completed and pending tasks.
#[must_use]
pub fn stats(tasks: &[Task]) -> Stats {
    let completed = tasks.iter().filter(|t| t.completed).count();
    Stats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
    }
}

fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        1
    } else {
        total.div_ceil(page_size).max(1)
    }
}

/// UI-only view parameters.
///
/// Changing the search text, the filter (see
/// [`on_filter_changed`](Self::on_filter_changed)) or the page size sends
/// the view back to page 1. Changing the page index touches nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    query: ViewQuery,
}

impl ViewState {
    /// Default view: no search, page 1, [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default view with a specific page size.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        let mut state = Self::new();
        state.query.page_size = page_size;
        state
    }

    /// The current parameters.
    #[must_use]
    pub const fn query(&self) -> &ViewQuery {
        &self.query
    }

    /// Current search text.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.query.search
    }

    /// Current 1-based page index.
    #[must_use]
    pub const fn page_index(&self) -> usize {
        self.query.page_index
    }

    /// Current page size.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.query.page_size
    }

    /// Replaces the search text and returns to page 1.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
        self.reset_page();
    }

    /// Moves to `page_index` (values below 1 become 1).
    pub fn set_page_index(&mut self, page_index: usize) {
        self.query.page_index = page_index.max(1);
    }

    /// Changes the page size and returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.query.page_size = page_size;
        self.reset_page();
    }

    /// Returns to page 1 after the store's filter changed.
    pub fn on_filter_changed(&mut self) {
        self.reset_page();
    }

    /// Returns to page 1.
    pub fn reset_page(&mut self) {
        self.query.page_index = 1;
    }

    /// Projects `tasks` with the current parameters.
    #[must_use]
    pub fn project(&self, tasks: &[Task], filter: Filter) -> Page {
        project(tasks, filter, &self.query)
    }
}
