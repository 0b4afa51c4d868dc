//! Bounded lookup table of accepted tasks.
//!
//! Unfinished tasks are always retained. Once the table is over capacity the
//! oldest terminal tasks are forgotten first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::core::Task;
use crate::util::serde::TaskId;

/// Tasks keyed by id, remembered in submission order.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Arc<Task>>,
    order: VecDeque<TaskId>,
    capacity: usize,
}

impl TaskRegistry {
    /// Create a registry retaining about `capacity` tasks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tasks: HashMap::with_capacity(capacity.min(4096)),
            order: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Remember `task`, evicting old terminal tasks if over capacity.
    ///
    /// A task reusing a known id replaces the earlier entry in place.
    pub fn insert(&mut self, task: Arc<Task>) {
        let id = task.id();
        if self.tasks.insert(id, task).is_none() {
            self.order.push_back(id);
        }
        self.evict();
    }

    fn evict(&mut self) {
        while self.tasks.len() > self.capacity {
            let tasks = &self.tasks;
            let Some(pos) = self
                .order
                .iter()
                .position(|id| tasks.get(id).is_some_and(|t| t.is_terminal()))
            else {
                // Everything retained is still unfinished.
                break;
            };
            if let Some(id) = self.order.remove(pos) {
                self.tasks.remove(&id);
            }
        }
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.get(&id).cloned()
    }

    /// Retained tasks in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Retained tasks that have not reached a terminal status.
    #[must_use]
    pub fn unfinished(&self) -> Vec<Arc<Task>> {
        self.iter().filter(|t| !t.is_terminal()).cloned().collect()
    }

    /// Number of retained tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionEngine, ResourcePool};
    use crate::util::clock::ManualClock;
    use crate::util::serde::{Resources, TaskKind};

    fn task(id: TaskId) -> Arc<Task> {
        Arc::new(Task::new(id, TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1).unwrap())
    }

    fn finish(task: &Task) {
        let pool = Arc::new(ResourcePool::new(Resources::units(10, 10, 10)));
        ExecutionEngine::new(pool, ManualClock::new()).execute(task).unwrap();
    }

    #[test]
    fn test_oldest_terminal_evicted_first() {
        let mut registry = TaskRegistry::new(2);
        for id in 1..=3 {
            let t = task(id);
            finish(&t);
            registry.insert(t);
        }
        assert_eq!(registry.len(), 2);
        assert!(registry.get(1).is_none());
        let ids: Vec<TaskId> = registry.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_unfinished_tasks_are_kept() {
        let mut registry = TaskRegistry::new(2);
        let done = task(1);
        finish(&done);
        registry.insert(done);
        for id in 2..=4 {
            registry.insert(task(id));
        }
        // Only the finished task could be dropped.
        assert_eq!(registry.len(), 3);
        assert!(registry.get(1).is_none());
        assert_eq!(registry.unfinished().len(), 3);
    }

    #[test]
    fn test_duplicate_id_replaces_entry() {
        let mut registry = TaskRegistry::new(4);
        registry.insert(task(7));
        registry.insert(task(7));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().count(), 1);
    }
}
