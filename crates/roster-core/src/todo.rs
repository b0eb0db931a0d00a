//! Persistent task list with a single
//! inline edit session.
//!
//! Every committed mutation writes the
//! whole collection back to its slot
//! before returning. A failed write does
//! not undo the in-memory change; it is
//! logged and reported through
//! [`Saved::Failed`].

use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info,
  warn
};

use crate::storage::Slot;
use crate::task::{
  StatusFilter,
  Task,
  TaskId
};

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct EditSession {
  pub target: TaskId,
  pub draft:  String
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum Saved {
  Written,
  /// Session-only change; nothing to
  /// write.
  Skipped,
  Failed(String)
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum Outcome {
  Applied(Saved),
  /// Empty or whitespace-only title.
  Rejected,
  NotFound,
  NoSession
}

impl Outcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, Outcome::Applied(_))
  }
}

#[derive(Debug)]
pub struct TaskStore<S: Slot> {
  slot:    S,
  tasks:   Vec<Task>,
  editing: Option<EditSession>
}

impl<S: Slot> TaskStore<S> {
  /// Malformed or unreadable contents
  /// load as an empty list.
  #[tracing::instrument(skip(slot))]
  pub fn load(slot: S) -> Self {
    let tasks = match slot.read() {
      | Ok(Some(raw)) => {
        match serde_json::from_str::<
          Vec<Task>
        >(&raw)
        {
          | Ok(tasks) => tasks,
          | Err(err) => {
            warn!(
              error = %err,
              "stored tasks are malformed; starting empty"
            );
            Vec::new()
          }
        }
      }
      | Ok(None) => Vec::new(),
      | Err(err) => {
        warn!(
          error = %err,
          "failed reading stored tasks; starting empty"
        );
        Vec::new()
      }
    };

    info!(
      count = tasks.len(),
      "loaded tasks"
    );
    Self {
      slot,
      tasks,
      editing: None
    }
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: TaskId
  ) -> Option<&Task> {
    self.tasks.iter().find(|t| t.id == id)
  }

  pub fn editing(
    &self
  ) -> Option<&EditSession> {
    self.editing.as_ref()
  }

  pub fn slot(&self) -> &S {
    &self.slot
  }

  pub fn view(
    &self,
    filter: StatusFilter
  ) -> Vec<&Task> {
    self
      .tasks
      .iter()
      .filter(|task| filter.admits(task))
      .collect()
  }

  #[tracing::instrument(skip(self, now))]
  pub fn add(
    &mut self,
    title: &str,
    now: DateTime<Utc>
  ) -> Outcome {
    if title.trim().is_empty() {
      debug!("ignoring empty title");
      return Outcome::Rejected;
    }

    let floor = self
      .tasks
      .iter()
      .map(|t| t.id)
      .max();
    let id = TaskId::next(now, floor);
    self.tasks.push(Task::new_active(
      id,
      title.to_string()
    ));
    debug!(%id, "task added");
    Outcome::Applied(self.save())
  }

  #[tracing::instrument(skip(self))]
  pub fn delete(
    &mut self,
    id: TaskId
  ) -> Outcome {
    let Some(idx) = self.position(id)
    else {
      return Outcome::NotFound;
    };
    self.tasks.remove(idx);
    if self
      .editing
      .as_ref()
      .is_some_and(|s| s.target == id)
    {
      debug!(%id, "closing edit of deleted task");
      self.editing = None;
    }
    Outcome::Applied(self.save())
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle_complete(
    &mut self,
    id: TaskId
  ) -> Outcome {
    let Some(idx) = self.position(id)
    else {
      return Outcome::NotFound;
    };
    let task = &mut self.tasks[idx];
    task.completed = !task.completed;
    debug!(
      %id,
      completed = task.completed,
      "toggled task"
    );
    Outcome::Applied(self.save())
  }

  /// Replaces any open session, even
  /// one on another task, without
  /// saving it.
  #[tracing::instrument(skip(self))]
  pub fn begin_edit(
    &mut self,
    id: TaskId
  ) -> Outcome {
    let Some(task) = self.get(id) else {
      return Outcome::NotFound;
    };
    let session = EditSession {
      target: id,
      draft:  task.title.clone()
    };
    if let Some(prior) = self
      .editing
      .replace(session)
      .filter(|prior| prior.target != id)
    {
      debug!(
        prior = %prior.target,
        "discarded prior edit session"
      );
    }
    Outcome::Applied(Saved::Skipped)
  }

  pub fn set_draft(
    &mut self,
    text: &str
  ) -> Outcome {
    match self.editing.as_mut() {
      | Some(session) => {
        session.draft = text.to_string();
        Outcome::Applied(Saved::Skipped)
      }
      | None => Outcome::NoSession
    }
  }

  /// The draft is written verbatim;
  /// an empty draft is accepted.
  #[tracing::instrument(skip(self))]
  pub fn commit_edit(&mut self) -> Outcome {
    let Some(session) = self.editing.take()
    else {
      return Outcome::NoSession;
    };
    let Some(idx) =
      self.position(session.target)
    else {
      return Outcome::NotFound;
    };
    self.tasks[idx].title = session.draft;
    debug!(id = %session.target, "committed edit");
    Outcome::Applied(self.save())
  }

  pub fn cancel_edit(&mut self) -> Outcome {
    match self.editing.take() {
      | Some(_) => {
        Outcome::Applied(Saved::Skipped)
      }
      | None => Outcome::NoSession
    }
  }

  fn position(
    &self,
    id: TaskId
  ) -> Option<usize> {
    self
      .tasks
      .iter()
      .position(|t| t.id == id)
  }

  fn save(&mut self) -> Saved {
    let result =
      serde_json::to_string(&self.tasks)
        .map_err(anyhow::Error::from)
        .and_then(|json| {
          self.slot.write(&json)
        });
    match result {
      | Ok(()) => {
        debug!(
          count = self.tasks.len(),
          "saved tasks"
        );
        Saved::Written
      }
      | Err(err) => {
        warn!(
          error = %err,
          "failed to save tasks; keeping in-memory change"
        );
        Saved::Failed(format!("{err:#}"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::storage::MemorySlot;

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .unwrap()
  }

  fn store_with(
    titles: &[&str]
  ) -> TaskStore<MemorySlot> {
    let mut store = TaskStore::load(
      MemorySlot::default()
    );
    for title in titles {
      assert!(
        store.add(title, now()).is_applied()
      );
    }
    store
  }

  #[test]
  fn empty_titles_are_rejected() {
    let mut store = store_with(&[]);
    assert_eq!(
      store.add("", now()),
      Outcome::Rejected
    );
    assert_eq!(
      store.add("   ", now()),
      Outcome::Rejected
    );
    assert!(store.tasks().is_empty());
    assert_eq!(store.slot().writes, 0);
  }

  #[test]
  fn add_appends_active_task_with_unique_id()
  {
    let mut store =
      store_with(&["first"]);
    assert_eq!(
      store.add("buy milk", now()),
      Outcome::Applied(Saved::Written)
    );

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].title, "buy milk");
    assert!(!tasks[1].completed);
    assert_ne!(tasks[0].id, tasks[1].id);
    assert_eq!(store.slot().writes, 2);
  }

  #[test]
  fn add_keeps_title_untrimmed() {
    let store =
      store_with(&["  padded  "]);
    assert_eq!(
      store.tasks()[0].title,
      "  padded  "
    );
  }

  #[test]
  fn toggle_twice_restores_state() {
    let mut store = store_with(&["a"]);
    let id = store.tasks()[0].id;

    store.toggle_complete(id);
    assert!(store.tasks()[0].completed);
    store.toggle_complete(id);
    assert!(!store.tasks()[0].completed);
  }

  #[test]
  fn unknown_ids_are_noops() {
    let mut store = store_with(&["a"]);
    let before = store.tasks().to_vec();
    let writes = store.slot().writes;

    assert_eq!(
      store.toggle_complete(TaskId(1)),
      Outcome::NotFound
    );
    assert_eq!(
      store.delete(TaskId(1)),
      Outcome::NotFound
    );
    assert_eq!(
      store.begin_edit(TaskId(1)),
      Outcome::NotFound
    );
    assert_eq!(store.tasks(), &before[..]);
    assert_eq!(store.slot().writes, writes);
  }

  #[test]
  fn view_preserves_order_and_predicate()
  {
    let mut store = store_with(&[
      "a", "b", "c", "d"
    ]);
    let ids: Vec<TaskId> = store
      .tasks()
      .iter()
      .map(|t| t.id)
      .collect();
    store.toggle_complete(ids[1]);
    store.toggle_complete(ids[3]);

    let titles = |filter| {
      store
        .view(filter)
        .iter()
        .map(|t| t.title.clone())
        .collect::<Vec<_>>()
    };
    assert_eq!(
      titles(StatusFilter::All),
      ["a", "b", "c", "d"]
    );
    assert_eq!(
      titles(StatusFilter::Active),
      ["a", "c"]
    );
    assert_eq!(
      titles(StatusFilter::Completed),
      ["b", "d"]
    );
  }

  #[test]
  fn commit_without_change_keeps_title()
  {
    let slot = MemorySlot::with_contents(
      r#"[{"id":1,"title":"A","completed":false}]"#
    );
    let mut store = TaskStore::load(slot);

    store.begin_edit(TaskId(1));
    assert_eq!(
      store.editing().map(|s| s.draft.as_str()),
      Some("A")
    );
    assert!(store.commit_edit().is_applied());
    assert_eq!(store.tasks()[0].title, "A");
    assert_eq!(store.editing(), None);
  }

  #[test]
  fn commit_writes_draft_verbatim() {
    let mut store = store_with(&["a"]);
    let id = store.tasks()[0].id;

    store.begin_edit(id);
    store.set_draft("");
    assert!(store.commit_edit().is_applied());
    assert_eq!(store.tasks()[0].title, "");
  }

  #[test]
  fn begin_edit_on_other_task_discards_draft()
  {
    let mut store =
      store_with(&["a", "b"]);
    let a = store.tasks()[0].id;
    let b = store.tasks()[1].id;

    store.begin_edit(a);
    store.set_draft("changed");
    store.begin_edit(b);

    let session = store.editing().unwrap();
    assert_eq!(session.target, b);
    assert_eq!(session.draft, "b");

    store.commit_edit();
    assert_eq!(store.tasks()[0].title, "a");
  }

  #[test]
  fn cancel_edit_leaves_tasks_untouched()
  {
    let mut store = store_with(&["a"]);
    let id = store.tasks()[0].id;
    let writes = store.slot().writes;

    store.begin_edit(id);
    store.set_draft("other");
    assert!(store.cancel_edit().is_applied());
    assert_eq!(store.tasks()[0].title, "a");
    assert_eq!(store.slot().writes, writes);
    assert_eq!(
      store.commit_edit(),
      Outcome::NoSession
    );
  }

  #[test]
  fn deleting_edit_target_closes_session()
  {
    let mut store = store_with(&["a"]);
    let id = store.tasks()[0].id;

    store.begin_edit(id);
    store.delete(id);
    assert_eq!(store.editing(), None);
    assert!(store.tasks().is_empty());
  }

  #[test]
  fn malformed_blob_loads_empty() {
    let store = TaskStore::load(
      MemorySlot::with_contents("{not json")
    );
    assert!(store.tasks().is_empty());
  }

  #[test]
  fn failed_write_keeps_mutation() {
    let mut store = TaskStore::load(
      MemorySlot {
        failing: true,
        ..MemorySlot::default()
      }
    );

    let outcome = store.add("a", now());
    assert!(matches!(
      outcome,
      Outcome::Applied(Saved::Failed(_))
    ));
    assert_eq!(store.tasks().len(), 1);
  }

  #[test]
  fn saved_blob_reloads_equal() {
    let mut store =
      store_with(&["a", "b"]);
    let id = store.tasks()[1].id;
    store.toggle_complete(id);

    let blob = store
      .slot()
      .contents
      .clone()
      .unwrap();
    let reloaded = TaskStore::load(
      MemorySlot::with_contents(blob)
    );
    assert_eq!(
      reloaded.tasks(),
      store.tasks()
    );
  }
}
