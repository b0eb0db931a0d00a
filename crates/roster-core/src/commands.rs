use anyhow::Context;
use chrono::Utc;
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::auth::{
  AuthClient,
  Credentials,
  LoginOutcome
};
use crate::cli::{
  Command,
  CredentialArgs,
  RecordsArgs,
  TodoCommand
};
use crate::config::Config;
use crate::render::Renderer;
use crate::source::HttpRecordSource;
use crate::storage::{
  DataDir,
  Slot
};
use crate::task::StatusFilter;
use crate::todo::{
  Outcome,
  Saved,
  TaskStore
};
use crate::viewer::RecordViewer;

#[instrument(skip_all)]
pub fn dispatch(
  data: &DataDir,
  cfg: &Config,
  renderer: &Renderer,
  command: Command
) -> anyhow::Result<()> {
  debug!(?command, "dispatching command");

  match command {
    | Command::Todo(todo) => {
      cmd_todo(data, renderer, todo)
    }
    | Command::Records(args) => {
      block_on(cmd_records(
        cfg, renderer, args
      ))?
    }
    | Command::Login(args) => {
      block_on(cmd_login(data, cfg, args))?
    }
    | Command::Register(args) => {
      block_on(cmd_register(cfg, args))?
    }
    | Command::Token => cmd_token(data)
  }
}

/// Network commands run on a
/// single-threaded runtime.
fn block_on<F: Future>(
  future: F
) -> anyhow::Result<F::Output> {
  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  Ok(runtime.block_on(future))
}

#[instrument(skip(data, renderer))]
fn cmd_todo(
  data: &DataDir,
  renderer: &Renderer,
  command: TodoCommand
) -> anyhow::Result<()> {
  let mut store =
    TaskStore::load(data.tasks_slot());

  match command {
    | TodoCommand::Add {
      title
    } => {
      let title = title.join(" ");
      let outcome =
        store.add(&title, Utc::now());
      if let Some(task) = outcome
        .is_applied()
        .then(|| store.tasks().last())
        .flatten()
      {
        println!("Created task {}.", task.id);
      }
      report(&outcome);
    }
    | TodoCommand::List {
      filter
    } => {
      renderer.print_tasks(
        &store.view(filter)
      )?;
    }
    | TodoCommand::Toggle {
      id
    } => {
      let outcome = store.toggle_complete(id);
      if let Some(task) = store.get(id) {
        let state = if task.completed {
          "completed"
        } else {
          "active"
        };
        println!("Task {id} is now {state}.");
      }
      report(&outcome);
    }
    | TodoCommand::Delete {
      id
    } => {
      let outcome = store.delete(id);
      if outcome.is_applied() {
        println!("Deleted task {id}.");
      }
      report(&outcome);
    }
    | TodoCommand::Edit {
      id,
      title
    } => {
      let outcome = match store.begin_edit(id)
      {
        | Outcome::Applied(_) => {
          store.set_draft(&title.join(" "));
          store.commit_edit()
        }
        | other => other
      };
      if outcome.is_applied() {
        println!("Updated task {id}.");
      }
      report(&outcome);
    }
  }

  debug!(
    total = store.tasks().len(),
    active = store
      .view(StatusFilter::Active)
      .len(),
    "todo command finished"
  );
  Ok(())
}

fn report(outcome: &Outcome) {
  if let Some(warning) = save_warning(outcome)
  {
    eprintln!("{warning}");
  }
}

fn save_warning(
  outcome: &Outcome
) -> Option<String> {
  match outcome {
    | Outcome::Applied(Saved::Failed(
      reason
    )) => Some(format!(
      "warning: change kept in memory \
       but not saved: {reason}"
    )),
    | Outcome::Applied(_) => None,
    | Outcome::Rejected => {
      debug!("empty title ignored");
      None
    }
    | Outcome::NotFound => {
      debug!("no task with that id");
      None
    }
    | Outcome::NoSession => {
      debug!("no edit in progress");
      None
    }
  }
}

fn credentials(
  args: CredentialArgs
) -> anyhow::Result<Credentials> {
  let password =
    resolve_password(args.password, || {
      rpassword::prompt_password(
        "Password: "
      )
    })?;
  Ok(Credentials {
    username: args.username,
    password
  })
}

fn resolve_password<F>(
  given: Option<String>,
  prompt: F
) -> anyhow::Result<String>
where
  F: FnOnce() -> std::io::Result<String>
{
  match given {
    | Some(password) => Ok(password),
    | None => {
      prompt().context(
        "failed to read password"
      )
    }
  }
}

#[instrument(skip(cfg, renderer))]
async fn cmd_records(
  cfg: &Config,
  renderer: &Renderer,
  args: RecordsArgs
) -> anyhow::Result<()> {
  let source =
    HttpRecordSource::new(cfg.records_url())?;
  let mut viewer =
    RecordViewer::new(cfg.page_size()?);

  let view = viewer
    .load(&source)
    .await
    .with_context(|| {
      format!(
        "failed to load records from {}",
        source.url()
      )
    })?;

  if let Some(query) = args.search.as_deref()
  {
    view.set_search_query(query);
  }
  for key in args.sort {
    view.set_sort(key);
  }
  if let Some(page) = args.page {
    view.set_page(page);
  }

  renderer.print_record_page(view)
}

#[instrument(skip(data, cfg, args), fields(username = %args.username))]
async fn cmd_login(
  data: &DataDir,
  cfg: &Config,
  args: CredentialArgs
) -> anyhow::Result<()> {
  let creds = credentials(args)?;
  let client =
    AuthClient::new(&cfg.auth_url())?;
  let outcome = client.login(&creds).await;

  if let LoginOutcome::Success {
    access_token
  } = &outcome
  {
    let mut slot = data.token_slot();
    if let Err(err) =
      slot.write(access_token)
    {
      warn!(error = %err, "failed to store access token");
    } else {
      info!(
        slot = %slot.path().display(),
        "stored access token"
      );
    }
  }

  println!("{}", outcome.message());
  Ok(())
}

#[instrument(skip(cfg, args), fields(username = %args.username))]
async fn cmd_register(
  cfg: &Config,
  args: CredentialArgs
) -> anyhow::Result<()> {
  let creds = credentials(args)?;
  let client =
    AuthClient::new(&cfg.auth_url())?;
  let outcome =
    client.register(&creds).await;
  println!("{}", outcome.message);
  Ok(())
}

fn cmd_token(
  data: &DataDir
) -> anyhow::Result<()> {
  match data.token_slot().read()? {
    | Some(token)
      if !token.trim().is_empty() =>
    {
      println!("{}", token.trim());
    }
    | _ => {
      println!("No access token stored.");
    }
  }
  Ok(())
}
