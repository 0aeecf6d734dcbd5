use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::TaskGraphError;
use crate::task::{Task, TaskId};

/// Dependency structure of a task batch, for traversal and analysis.
#[derive(Debug, Clone)]
pub struct TaskGraph {
  /// Task ids in input order.
  order: Vec<TaskId>,
  /// Scheduling key per task: (priority, input position).
  keys: HashMap<TaskId, (i32, usize)>,
  /// task_id -> tasks that depend on it.
  adjacency: HashMap<TaskId, Vec<TaskId>>,
  /// task_id -> its dependencies, in `depends_on` order.
  reverse_adjacency: HashMap<TaskId, Vec<TaskId>>,
  duplicates: Vec<TaskId>,
}

impl TaskGraph {
  /// Build a graph from a batch. The first task wins when ids repeat.
  pub fn new(tasks: &[Task]) -> Self {
    let mut order = Vec::with_capacity(tasks.len());
    let mut keys = HashMap::with_capacity(tasks.len());
    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut reverse_adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut duplicates = Vec::new();

    for (position, task) in tasks.iter().enumerate() {
      if keys.contains_key(&task.id) {
        duplicates.push(task.id.clone());
        continue;
      }
      keys.insert(task.id.clone(), (task.priority, position));
      order.push(task.id.clone());
      adjacency.entry(task.id.clone()).or_default();
      reverse_adjacency.insert(task.id.clone(), task.depends_on.clone());
    }

    for task_id in &order {
      for dep in &reverse_adjacency[task_id] {
        adjacency.entry(dep.clone()).or_default().push(task_id.clone());
      }
    }

    Self {
      order,
      keys,
      adjacency,
      reverse_adjacency,
      duplicates,
    }
  }

  pub fn contains(&self, task_id: &TaskId) -> bool {
    self.keys.contains_key(task_id)
  }

  /// Tasks with no dependencies, in input order.
  pub fn entry_points(&self) -> Vec<TaskId> {
    self
      .order
      .iter()
      .filter(|id| self.upstream(id).is_empty())
      .cloned()
      .collect()
  }

  /// Dependencies of a task, in `depends_on` order.
  pub fn upstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .reverse_adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Tasks that depend on the given task.
  pub fn downstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// `(task, dependency)` pairs whose dependency is not part of the batch.
  pub fn missing_dependencies(&self) -> Vec<(TaskId, TaskId)> {
    self
      .order
      .iter()
      .flat_map(|id| {
        self
          .upstream(id)
          .iter()
          .filter(|dep| !self.contains(dep))
          .map(move |dep| (id.clone(), dep.clone()))
      })
      .collect()
  }

  /// Kahn's algorithm over the batch. Ties are broken by priority, then by
  /// input position. Returns the ordered tasks and the ones that never became
  /// ready (cycles, or depending on something that is missing or cyclic).
  fn kahn(&self) -> (Vec<TaskId>, Vec<TaskId>) {
    let mut indegree: HashMap<&TaskId, usize> = self
      .order
      .iter()
      .map(|id| (id, self.upstream(id).len()))
      .collect();

    let mut ready: BTreeSet<(i32, usize, &TaskId)> = indegree
      .iter()
      .filter(|(_, degree)| **degree == 0)
      .map(|(id, _)| {
        let (priority, position) = self.keys[*id];
        (priority, position, *id)
      })
      .collect();

    let mut sorted = Vec::with_capacity(self.order.len());
    while let Some(entry) = ready.pop_first() {
      let (_, _, id) = entry;
      sorted.push(id.clone());
      for next in self.downstream(id) {
        if let Some(degree) = indegree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            let (priority, position) = self.keys[next];
            ready.insert((priority, position, next));
          }
        }
      }
    }

    let placed: HashSet<&TaskId> = sorted.iter().collect();
    let stuck = self
      .order
      .iter()
      .filter(|id| !placed.contains(id))
      .cloned()
      .collect();
    (sorted, stuck)
  }

  /// Tasks that can never run because of a cycle or a missing dependency,
  /// including everything downstream of them. Input order is preserved.
  pub fn unresolvable(&self) -> Vec<TaskId> {
    self.kahn().1
  }

  /// Check the batch: unique ids, no missing dependencies, no cycles.
  pub fn validate(&self) -> Result<(), TaskGraphError> {
    if let Some(id) = self.duplicates.first() {
      return Err(TaskGraphError::DuplicateId(id.clone()));
    }
    if let Some((task, dependency)) = self.missing_dependencies().into_iter().next() {
      return Err(TaskGraphError::MissingDependency { task, dependency });
    }
    let (_, stuck) = self.kahn();
    if !stuck.is_empty() {
      return Err(TaskGraphError::Cycle { tasks: stuck });
    }
    Ok(())
  }

  /// A dependency-respecting order that prefers lower priority first.
  pub fn topological_order(&self) -> Result<Vec<TaskId>, TaskGraphError> {
    self.validate()?;
    Ok(self.kahn().0)
  }
}
