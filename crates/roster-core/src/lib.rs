pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod record;
pub mod render;
pub mod source;
pub mod storage;
pub mod task;
pub mod todo;
pub mod transform;
pub mod viewer;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting roster CLI"
  );

  let mut cfg = config::Config::load(
    cli.rosterrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(
    files = ?cfg.loaded_files,
    "configuration ready"
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let data =
    storage::DataDir::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open data \
           directory at {}",
          data_dir.display()
        )
      })?;

  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    &data,
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
