use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Record {
  pub id:       RecordId,
  pub name:     String,
  pub username: String,
  pub email:    String,

  #[serde(flatten)]
  pub extra:
    BTreeMap<String, serde_json::Value>
}

impl Record {
  pub fn new(
    id: u64,
    name: &str,
    username: &str,
    email: &str
  ) -> Self {
    Self {
      id: RecordId::from(id),
      name: name.to_string(),
      username: username.to_string(),
      email: email.to_string(),
      extra: BTreeMap::new()
    }
  }

  pub fn searchable_fields(
    &self
  ) -> [&str; 3] {
    [
      self.name.as_str(),
      self.username.as_str(),
      self.email.as_str()
    ]
  }

  pub fn sort_value(
    &self,
    key: SortKey
  ) -> SortValue<'_> {
    match key {
      | SortKey::Id => {
        match &self.id {
          | RecordId::Number(n) => {
            SortValue::Number(n)
          }
          | RecordId::Text(t) => {
            SortValue::Text(t)
          }
        }
      }
      | SortKey::Name => {
        SortValue::Text(&self.name)
      }
      | SortKey::Username => {
        SortValue::Text(&self.username)
      }
      | SortKey::Email => {
        SortValue::Text(&self.email)
      }
    }
  }
}

/// Identifier as the source sent it.
/// Numbers of any sign or precision
/// and text are both accepted.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(untagged)]
pub enum RecordId {
  Number(serde_json::Number),
  Text(String)
}

impl RecordId {
  pub fn as_u64(&self) -> Option<u64> {
    match self {
      | RecordId::Number(n) => n.as_u64(),
      | RecordId::Text(_) => None
    }
  }
}

impl From<u64> for RecordId {
  fn from(id: u64) -> Self {
    RecordId::Number(id.into())
  }
}

impl From<&str> for RecordId {
  fn from(id: &str) -> Self {
    RecordId::Text(id.to_string())
  }
}

impl fmt::Display for RecordId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | RecordId::Number(n) => {
        write!(f, "{n}")
      }
      | RecordId::Text(t) => f.write_str(t)
    }
  }
}

/// Comparable field value. Numbers
/// order by value and sort before text.
#[derive(Debug, Clone, Copy)]
pub enum SortValue<'a> {
  Number(&'a serde_json::Number),
  Text(&'a str)
}

impl Ord for SortValue<'_> {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      | (
        SortValue::Number(a),
        SortValue::Number(b)
      ) => compare_numbers(a, b),
      | (
        SortValue::Number(_),
        SortValue::Text(_)
      ) => Ordering::Less,
      | (
        SortValue::Text(_),
        SortValue::Number(_)
      ) => Ordering::Greater,
      | (
        SortValue::Text(a),
        SortValue::Text(b)
      ) => a.cmp(b)
    }
  }
}

impl PartialOrd for SortValue<'_> {
  fn partial_cmp(
    &self,
    other: &Self
  ) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for SortValue<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for SortValue<'_> {}

/// Exact for integers, IEEE total order
/// once a fraction is involved.
fn compare_numbers(
  a: &serde_json::Number,
  b: &serde_json::Number
) -> Ordering {
  if let (Some(x), Some(y)) =
    (a.as_i64(), b.as_i64())
  {
    return x.cmp(&y);
  }
  if let (Some(x), Some(y)) =
    (a.as_u64(), b.as_u64())
  {
    return x.cmp(&y);
  }
  let x = a.as_f64().unwrap_or(f64::NAN);
  let y = b.as_f64().unwrap_or(f64::NAN);
  x.total_cmp(&y)
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  clap::ValueEnum,
)]
pub enum SortKey {
  Id,
  Name,
  Username,
  Email
}

impl SortKey {
  pub const ALL: [SortKey; 4] = [
    SortKey::Id,
    SortKey::Name,
    SortKey::Username,
    SortKey::Email
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | SortKey::Id => "id",
      | SortKey::Name => "name",
      | SortKey::Username => "username",
      | SortKey::Email => "email"
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortKey {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let wanted =
      s.trim().to_ascii_lowercase();
    SortKey::ALL
      .into_iter()
      .find(|key| key.as_str() == wanted)
      .ok_or_else(|| {
        anyhow!("unknown sort key: {s}")
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending
}

impl SortDirection {
  pub fn flipped(self) -> Self {
    match self {
      | SortDirection::Ascending => {
        SortDirection::Descending
      }
      | SortDirection::Descending => {
        SortDirection::Ascending
      }
    }
  }
}
