use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Args,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::record::SortKey;
use crate::task::{
  StatusFilter,
  TaskId
};

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "roster",
  version,
  about = "Roster: a persistent task list and a searchable record table"
)]
pub struct GlobalCli {
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append,
    global = true
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "rosterrc", global = true)]
  pub rosterrc: Option<PathBuf>,

  #[arg(long = "data", global = true)]
  pub data: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Manage the persistent task list.
  #[command(subcommand)]
  Todo(TodoCommand),

  /// Search, sort and page through the
  /// remote record table.
  Records(RecordsArgs),

  /// Exchange credentials for an access
  /// token.
  Login(CredentialArgs),

  Register(CredentialArgs),

  /// Print the stored access token.
  Token
}

#[derive(Subcommand, Debug, Clone)]
pub enum TodoCommand {
  Add {
    #[arg(
      trailing_var_arg = true,
      allow_hyphen_values = true
    )]
    title: Vec<String>
  },
  List {
    #[arg(
      long,
      value_enum,
      default_value_t = StatusFilter::All
    )]
    filter: StatusFilter
  },
  Toggle {
    id: TaskId
  },
  Delete {
    id: TaskId
  },
  Edit {
    id:    TaskId,
    #[arg(
      trailing_var_arg = true,
      allow_hyphen_values = true
    )]
    title: Vec<String>
  }
}

#[derive(Args, Debug, Clone)]
pub struct RecordsArgs {
  #[arg(long)]
  pub search: Option<String>,

  /// Applied in order; naming the same
  /// key twice flips its direction.
  #[arg(long = "sort", value_enum, action = ArgAction::Append)]
  pub sort: Vec<SortKey>,

  #[arg(long, allow_negative_numbers = true)]
  pub page: Option<i64>
}

#[derive(Args, Clone)]
pub struct CredentialArgs {
  #[arg(long, short = 'u')]
  pub username: String,

  /// Prompted for when neither the flag
  /// nor the variable is set.
  #[arg(
    long,
    short = 'p',
    env = "ROSTER_PASSWORD",
    hide_env_values = true
  )]
  pub password: Option<String>
}

impl fmt::Debug for CredentialArgs {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("CredentialArgs")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log \
           filter: {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_writer(std::io::stderr)
      .with_target(true)
      .with_level(true)
      .with_thread_ids(true)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn repeated_sort_flags_keep_order() {
    let cli = GlobalCli::parse_from([
      "roster", "records", "--sort",
      "name", "--sort", "email",
      "--sort", "name", "--page", "-2"
    ]);
    let Command::Records(args) =
      cli.command
    else {
      panic!("expected records command");
    };
    assert_eq!(
      args.sort,
      [
        SortKey::Name,
        SortKey::Email,
        SortKey::Name
      ]
    );
    assert_eq!(args.page, Some(-2));
  }

  #[test]
  fn todo_add_joins_title_words() {
    let cli = GlobalCli::parse_from([
      "roster", "--rc",
      "color=off", "todo", "add", "buy",
      "milk"
    ]);
    assert_eq!(cli.rc_overrides.len(), 1);
    let Command::Todo(TodoCommand::Add {
      title
    }) = cli.command
    else {
      panic!("expected todo add");
    };
    assert_eq!(title.join(" "), "buy milk");
  }

  #[test]
  fn rejects_unknown_sort_key() {
    assert!(
      GlobalCli::try_parse_from([
        "roster", "records", "--sort",
        "phone"
      ])
      .is_err()
    );
  }

  #[test]
  fn password_flag_is_optional() {
    let cli = GlobalCli::parse_from([
      "roster", "login", "-u", "ada"
    ]);
    let Command::Login(args) = cli.command
    else {
      panic!("expected login");
    };
    assert_eq!(args.username, "ada");

    let cli = GlobalCli::parse_from([
      "roster", "register", "-u", "ada",
      "-p", "pw"
    ]);
    let Command::Register(args) =
      cli.command
    else {
      panic!("expected register");
    };
    assert_eq!(
      args.password.as_deref(),
      Some("pw")
    );
    assert!(
      !format!("{args:?}").contains("pw\"")
    );
  }

  #[test]
  fn keyval_requires_equals() {
    assert!(
      "color".parse::<KeyVal>().is_err()
    );
    let kv: KeyVal =
      " color = off ".parse().unwrap();
    assert_eq!(kv.key, "color");
    assert_eq!(kv.value, "off");
  }
}
