use std::fs;
use std::io::{
  ErrorKind,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info
};

pub const TASKS_SLOT: &str =
  "todos.json";
pub const TOKEN_SLOT: &str =
  "access_token";

/// A single named blob that is read
/// whole and overwritten whole.
pub trait Slot {
  fn read(
    &self
  ) -> anyhow::Result<Option<String>>;

  fn write(
    &mut self,
    contents: &str
  ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSlot {
  path: PathBuf
}

impl FileSlot {
  pub fn new(
    path: impl Into<PathBuf>
  ) -> Self {
    Self {
      path: path.into()
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Slot for FileSlot {
  #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
  fn read(
    &self
  ) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(&self.path)
    {
      | Ok(text) => {
        debug!(
          bytes = text.len(),
          "read slot"
        );
        Ok(Some(text))
      }
      | Err(err)
        if err.kind()
          == ErrorKind::NotFound =>
      {
        debug!("slot is empty");
        Ok(None)
      }
      | Err(err) => {
        Err(err).with_context(|| {
          format!(
            "failed reading {}",
            self.path.display()
          )
        })
      }
    }
  }

  #[tracing::instrument(skip(self, contents), fields(file = %self.path.display()))]
  fn write(
    &mut self,
    contents: &str
  ) -> anyhow::Result<()> {
    write_atomic(&self.path, contents)
  }
}

/// In-memory slot; `failing` makes
/// every write return an error.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
  pub contents: Option<String>,
  pub failing:  bool,
  pub writes:   usize
}

impl MemorySlot {
  pub fn with_contents(
    contents: impl Into<String>
  ) -> Self {
    Self {
      contents: Some(contents.into()),
      ..Self::default()
    }
  }
}

impl Slot for MemorySlot {
  fn read(
    &self
  ) -> anyhow::Result<Option<String>> {
    Ok(self.contents.clone())
  }

  fn write(
    &mut self,
    contents: &str
  ) -> anyhow::Result<()> {
    if self.failing {
      return Err(anyhow!(
        "memory slot rejected write"
      ));
    }
    self.contents =
      Some(contents.to_string());
    self.writes += 1;
    Ok(())
  }
}

#[derive(Debug)]
pub struct DataDir {
  pub root: PathBuf
}

impl DataDir {
  #[tracing::instrument(skip(root))]
  pub fn open(
    root: &Path
  ) -> anyhow::Result<Self> {
    let root = root.to_path_buf();
    fs::create_dir_all(&root)
      .with_context(|| {
        format!(
          "failed to create {}",
          root.display()
        )
      })?;

    info!(
      data_dir = %root.display(),
      "opened data directory"
    );
    Ok(Self {
      root
    })
  }

  pub fn slot(
    &self,
    name: &str
  ) -> FileSlot {
    FileSlot::new(self.root.join(name))
  }

  pub fn tasks_slot(&self) -> FileSlot {
    self.slot(TASKS_SLOT)
  }

  pub fn token_slot(&self) -> FileSlot {
    self.slot(TOKEN_SLOT)
  }
}

fn write_atomic(
  path: &Path,
  contents: &str
) -> anyhow::Result<()> {
  debug!(
    file = %path.display(),
    bytes = contents.len(),
    "writing slot atomically"
  );

  let dir = path
    .parent()
    .filter(|p| {
      !p.as_os_str().is_empty()
    })
    .unwrap_or_else(|| Path::new("."));
  let mut temp =
    NamedTempFile::new_in(dir)?;
  temp.write_all(contents.as_bytes())?;
  temp.flush()?;

  temp.persist(path).map_err(|err| {
    anyhow!(
      "failed to persist {}: {}",
      path.display(),
      err
    )
  })?;

  Ok(())
}
