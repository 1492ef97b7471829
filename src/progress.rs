use crate::store::{read_json, write_json, KeyValueStore, KEY_PROGRESS};
use crate::task::Task;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Composite key scoping one day's completions to one person.
pub fn progress_key(date: NaiveDate, person: &str) -> String {
    format!("{}_{}", date.format("%Y-%m-%d"), person)
}

/// Which task ids each (date, person) pair has checked off. Records are kept
/// forever; the queries below always recompute against the task list the
/// caller passes in, so ids of since-deleted tasks carry no weight.
#[derive(Debug, Default)]
pub struct ProgressLog {
    completed: BTreeMap<String, BTreeSet<u32>>,
}

impl ProgressLog {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            completed: read_json(store, KEY_PROGRESS),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        write_json(store, KEY_PROGRESS, &self.completed);
    }

    pub fn is_completed(&self, date: NaiveDate, person: &str, id: u32) -> bool {
        self.completed
            .get(&progress_key(date, person))
            .is_some_and(|set| set.contains(&id))
    }

    /// Flips completion of `id` for the given day and person and returns the
    /// new state. Completing a task is the caller's cue for celebratory
    /// feedback; the log itself only records it.
    pub fn toggle(&mut self, date: NaiveDate, person: &str, id: u32) -> bool {
        let set = self.completed.entry(progress_key(date, person)).or_default();
        let now_completed = if set.remove(&id) {
            false
        } else {
            set.insert(id);
            true
        };
        debug!(%date, person, id, now_completed, "toggled task");
        now_completed
    }

    /// How many of `tasks` are done, counting only ids that are actually in
    /// the list.
    pub fn completed_count(&self, date: NaiveDate, person: &str, tasks: &[Task]) -> usize {
        match self.completed.get(&progress_key(date, person)) {
            Some(set) => tasks.iter().filter(|t| set.contains(&t.id)).count(),
            None => 0,
        }
    }

    /// Completion percentage over `tasks`, 0 for an empty list.
    pub fn percentage(&self, date: NaiveDate, person: &str, tasks: &[Task]) -> f64 {
        if tasks.is_empty() {
            return 0.0;
        }
        self.completed_count(date, person, tasks) as f64 / tasks.len() as f64 * 100.0
    }

    /// True once every task in a non-empty `tasks` is checked off.
    pub fn all_completed(&self, date: NaiveDate, person: &str, tasks: &[Task]) -> bool {
        !tasks.is_empty() && self.completed_count(date, person, tasks) == tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn two_tasks() -> Vec<Task> {
        vec![Task::new(1, "A"), Task::new(2, "B")]
    }

    #[test]
    fn percentage_of_empty_list_is_zero() {
        let log = ProgressLog::default();
        assert_eq!(log.percentage(date(1), "x", &[]), 0.0);
        assert!(!log.all_completed(date(1), "x", &[]));
    }

    #[test]
    fn toggling_twice_restores_the_original_state() {
        let mut log = ProgressLog::default();
        assert!(!log.is_completed(date(1), "x", 1));
        assert!(log.toggle(date(1), "x", 1));
        assert!(log.is_completed(date(1), "x", 1));
        assert!(!log.toggle(date(1), "x", 1));
        assert!(!log.is_completed(date(1), "x", 1));
    }

    #[test]
    fn completion_scenario_for_two_tasks() {
        let tasks = two_tasks();
        let mut log = ProgressLog::default();
        let day = date(1);

        assert!(log.toggle(day, "x", 1));
        assert_eq!(log.percentage(day, "x", &tasks), 50.0);
        assert!(!log.all_completed(day, "x", &tasks));

        assert!(log.toggle(day, "x", 2));
        assert_eq!(log.percentage(day, "x", &tasks), 100.0);
        assert!(log.all_completed(day, "x", &tasks));

        assert!(!log.toggle(day, "x", 2));
        assert_eq!(log.percentage(day, "x", &tasks), 50.0);
        assert!(!log.all_completed(day, "x", &tasks));
    }

    #[test]
    fn all_completed_flips_exactly_on_the_last_toggle() {
        let tasks = two_tasks();
        let mut log = ProgressLog::default();
        let day = date(1);

        log.toggle(day, "x", 1);
        assert!(!log.all_completed(day, "x", &tasks));
        log.toggle(day, "x", 2);
        assert!(log.all_completed(day, "x", &tasks));
    }

    #[test]
    fn stale_ids_of_removed_tasks_do_not_count() {
        let mut log = ProgressLog::default();
        let day = date(1);
        log.toggle(day, "x", 1);
        log.toggle(day, "x", 99); // task 99 no longer exists

        let tasks = two_tasks();
        assert_eq!(log.completed_count(day, "x", &tasks), 1);
        assert_eq!(log.percentage(day, "x", &tasks), 50.0);
        assert!(!log.all_completed(day, "x", &tasks));

        // With only the stale id left, nothing current is done.
        log.toggle(day, "x", 1);
        assert_eq!(log.completed_count(day, "x", &tasks), 0);
    }

    #[test]
    fn progress_partitions_by_date_and_person() {
        let tasks = two_tasks();
        let mut log = ProgressLog::default();
        log.toggle(date(1), "x", 1);

        assert!(!log.is_completed(date(2), "x", 1));
        assert!(!log.is_completed(date(1), "y", 1));
        assert_eq!(log.percentage(date(2), "x", &tasks), 0.0);
        assert_eq!(log.percentage(date(1), "y", &tasks), 0.0);
    }

    #[test]
    fn log_round_trips_through_a_store() {
        use crate::store::MemoryStore;

        let mut store = MemoryStore::default();
        let mut log = ProgressLog::default();
        log.toggle(date(1), "x", 1);
        log.toggle(date(1), "x", 2);
        log.toggle(date(1), "x", 2);
        log.save(&mut store);

        let reloaded = ProgressLog::load(&store);
        assert!(reloaded.is_completed(date(1), "x", 1));
        assert!(!reloaded.is_completed(date(1), "x", 2));
    }

    #[test]
    fn load_tolerates_a_corrupt_store() {
        use crate::store::{KeyValueStore, MemoryStore, KEY_PROGRESS};

        let mut store = MemoryStore::default();
        store.set(KEY_PROGRESS, "{{{{");
        let log = ProgressLog::load(&store);
        assert!(!log.is_completed(date(1), "x", 1));
    }
}
