use std::cmp::Ordering;

use taskdeck::task::{Task, TaskId, TaskPriority, TaskStatus};

/// User-controlled search/filter state driving the list derivation. Not
/// persisted; an empty value means "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewParameters {
    pub search_text: String,
    pub status_filter: Option<TaskStatus>,
    pub priority_filter: Option<TaskPriority>,
}

/// Counters over the whole collection, independent of the active filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskListStats {
    pub completed: usize,
    pub pending: usize,
    pub urgent: usize,
}

/// Owns the in-memory task collection and the current view parameters. The
/// collection is only ever replaced wholesale, by a refresh from the remote
/// service; the derived sequence and statistics are recomputed on demand
/// from the current state.
#[derive(Debug, Default)]
pub struct TaskListModel {
    tasks: Vec<Task>,
    parameters: ViewParameters,
}

impl TaskListModel {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn view_parameters(&self) -> &ViewParameters {
        &self.parameters
    }

    pub fn set_search_text(&mut self, search_text: impl Into<String>) {
        self.parameters.search_text = search_text.into();
    }

    pub fn set_status_filter(&mut self, status_filter: Option<TaskStatus>) {
        self.parameters.status_filter = status_filter;
    }

    pub fn set_priority_filter(&mut self, priority_filter: Option<TaskPriority>) {
        self.parameters.priority_filter = priority_filter;
    }

    pub fn clear_filters(&mut self) {
        self.parameters = ViewParameters::default();
    }

    /// Number of engaged dropdown filters. Search text does not count.
    pub fn active_filters_count(&self) -> usize {
        usize::from(self.parameters.status_filter.is_some())
            + usize::from(self.parameters.priority_filter.is_some())
    }

    /// The filtered, sorted sequence to present.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        derive_task_list(&self.tasks, &self.parameters)
    }

    pub fn stats(&self) -> TaskListStats {
        TaskListStats {
            completed: self
                .tasks
                .iter()
                .filter(|task| task.status.is_completed())
                .count(),
            pending: self
                .tasks
                .iter()
                .filter(|task| !task.status.is_completed())
                .count(),
            urgent: self
                .tasks
                .iter()
                .filter(|task| task.priority.is_pressing())
                .count(),
        }
    }
}

/// Pure derivation of the presented sequence from a collection and view
/// parameters. Total for any input: unknown statuses and priorities filter
/// and sort without panicking.
pub fn derive_task_list(tasks: &[Task], parameters: &ViewParameters) -> Vec<Task> {
    let search = parameters.search_text.to_lowercase();
    let mut derived: Vec<Task> = tasks
        .iter()
        .filter(|task| {
            (search.is_empty()
                || task.title.to_lowercase().contains(&search)
                || task.description.to_lowercase().contains(&search))
                && parameters
                    .status_filter
                    .as_ref()
                    .is_none_or(|status| task.status == *status)
                && parameters
                    .priority_filter
                    .as_ref()
                    .is_none_or(|priority| task.priority == *priority)
        })
        .cloned()
        .collect();

    derived.sort_by(compare_tasks);
    derived
}

// Recency wins over completion: a strictly newer task sorts first even when
// completed. Completion state, then priority rank, only break exact
// `created_at` ties. The sort is stable, so full ties keep their incoming
// order.
fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.status.is_completed().cmp(&b.status.is_completed()))
        .then_with(|| a.priority.sort_rank().cmp(&b.priority.sort_rank()))
}
