use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_AUTH_URL: &str =
  "http://localhost:5000";
pub const DEFAULT_RECORDS_URL: &str =
  "https://jsonplaceholder.typicode.com/users";
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.roster"),
      ("auth.url", DEFAULT_AUTH_URL),
      ("records.url", DEFAULT_RECORDS_URL),
      ("records.page_size", "5"),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_rc_path(rc_override)? {
      | Some(path) => {
        info!(rc = %path.display(), "loading rosterrc");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!(
          "no rosterrc found; using \
           defaults"
        );
      }
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Whether colored output is wanted.
  /// Unset means on.
  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    match self.get("color") {
      | None => Ok(true),
      | Some(raw) => {
        parse_bool(&raw).ok_or_else(|| {
          anyhow!(
            "invalid color setting: {raw}"
          )
        })
      }
    }
  }

  pub fn auth_url(&self) -> String {
    self
      .get("auth.url")
      .unwrap_or_else(|| {
        DEFAULT_AUTH_URL.to_string()
      })
  }

  pub fn records_url(&self) -> String {
    self
      .get("records.url")
      .unwrap_or_else(|| {
        DEFAULT_RECORDS_URL.to_string()
      })
  }

  pub fn page_size(
    &self
  ) -> anyhow::Result<NonZeroUsize> {
    let Some(raw) =
      self.get("records.page_size")
    else {
      return NonZeroUsize::new(
        DEFAULT_PAGE_SIZE
      )
      .ok_or_else(|| {
        anyhow!("default page size is zero")
      });
    };
    raw
      .trim()
      .parse::<NonZeroUsize>()
      .map_err(|_| {
        anyhow!(
          "records.page_size must be a \
           positive integer, got: {raw}"
        )
      })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self.load_text(&text, &path)
  }

  fn load_text(
    &mut self,
    text: &str,
    path: &Path
  ) -> anyhow::Result<()> {
    self
      .loaded_files
      .push(path.to_path_buf());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map_or(raw_line, |(before, _)| {
          before
        })
        .trim();
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_dir {
    return Ok(path.to_path_buf());
  }
  if let Some(value) =
    cfg.get("data.location")
  {
    return Ok(expand_tilde(Path::new(
      &value
    )));
  }
  let home =
    dirs::home_dir().ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".roster"))
}

fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("ROSTERRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!("cannot determine home directory; skipping rosterrc");
    return Ok(None);
  };
  let candidate = home.join(".rosterrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off" | "false" => {
      Some(false)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn defaults_cover_every_key() {
    let cfg = Config::default();
    assert_eq!(
      cfg.auth_url(),
      DEFAULT_AUTH_URL
    );
    assert_eq!(
      cfg.page_size().unwrap().get(),
      5
    );
    assert!(cfg.color().unwrap());
  }

  #[test]
  fn color_accepts_short_forms_only() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "color".to_string(),
      "y".to_string()
    )]);
    assert!(cfg.color().unwrap());

    cfg.apply_overrides([(
      "rc.color".to_string(),
      "Off".to_string()
    )]);
    assert!(!cfg.color().unwrap());

    cfg.apply_overrides([(
      "color".to_string(),
      "sometimes".to_string()
    )]);
    assert!(
      cfg
        .color()
        .unwrap_err()
        .to_string()
        .contains("invalid color setting")
    );
  }

  #[test]
  fn rc_file_with_include_and_comments()
  {
    let temp = tempdir().unwrap();
    let extra = temp.path().join("extra.rc");
    fs::write(
      &extra,
      "records.page_size = 10\n"
    )
    .unwrap();
    let main = temp.path().join("rosterrc");
    fs::write(
      &main,
      "# local backend\n\
       auth.url = http://127.0.0.1:9000 # dev\n\
       include extra.rc\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(&main)).unwrap();
    assert_eq!(
      cfg.auth_url(),
      "http://127.0.0.1:9000"
    );
    assert_eq!(
      cfg.page_size().unwrap().get(),
      10
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "rc.records.page_size".to_string(),
      "0".to_string()
    )]);
    assert!(cfg.page_size().is_err());
  }

  #[test]
  fn malformed_line_is_an_error() {
    let mut cfg = Config::default();
    let err = cfg
      .load_text(
        "just words",
        Path::new("rosterrc")
      )
      .unwrap_err();
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn data_dir_override_wins() {
    let cfg = Config::default();
    let dir = resolve_data_dir(
      &cfg,
      Some(Path::new("/tmp/roster-data"))
    )
    .unwrap();
    assert_eq!(
      dir,
      PathBuf::from("/tmp/roster-data")
    );
  }
}
