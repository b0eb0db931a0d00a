use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
  /// Millisecond creation stamp, bumped
  /// past `floor` so ids stay unique
  /// and increasing within a store.
  pub fn next(
    now: DateTime<Utc>,
    floor: Option<TaskId>
  ) -> Self {
    let stamp = u64::try_from(
      now.timestamp_millis()
    )
    .unwrap_or(0);
    match floor {
      | Some(TaskId(last))
        if stamp <= last =>
      {
        TaskId(last.saturating_add(1))
      }
      | _ => TaskId(stamp)
    }
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for TaskId {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<u64>()
      .map(TaskId)
      .map_err(|_| {
        anyhow!("invalid task id: {s}")
      })
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct Task {
  pub id:        TaskId,
  pub title:     String,
  #[serde(default)]
  pub completed: bool
}

impl Task {
  pub fn new_active(
    id: TaskId,
    title: String
  ) -> Self {
    Self {
      id,
      title,
      completed: false
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  clap::ValueEnum,
)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  pub fn admits(
    self,
    task: &Task
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn next_id_uses_timestamp_then_bumps()
  {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .unwrap();
    let first = TaskId::next(now, None);
    assert_eq!(
      first.0,
      now.timestamp_millis() as u64
    );

    let second =
      TaskId::next(now, Some(first));
    assert_eq!(second.0, first.0 + 1);
  }

  #[test]
  fn filter_predicates() {
    let mut task = Task::new_active(
      TaskId(1),
      "x".to_string()
    );
    assert!(
      StatusFilter::Active.admits(&task)
    );
    assert!(
      !StatusFilter::Completed
        .admits(&task)
    );
    task.completed = true;
    assert!(
      StatusFilter::Completed
        .admits(&task)
    );
    assert!(
      StatusFilter::All.admits(&task)
    );
  }

  #[test]
  fn serialized_shape_is_flat() {
    let task = Task::new_active(
      TaskId(7),
      "buy milk".to_string()
    );
    let json =
      serde_json::to_value(&task)
        .unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "id": 7,
        "title": "buy milk",
        "completed": false
      })
    );
  }
}
