pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod render;
pub mod stats;
pub mod task;
pub mod view;

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
    "starting sprig CLI"
  );
  debug!(overrides = cli.rc_overrides.len(), "parsed rc overrides");

  let mut cfg = config::Config::load(
    cli.sprigrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
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

  let mut session =
    commands::Session::open(
      &data_dir, &cfg
    )
    .with_context(|| {
      format!(
        "failed to open task data at \
         {}",
        data_dir.display()
      )
    })?;

  let mut renderer =
    render::Renderer::new(&cfg)?;

  let command = cli
    .command
    .unwrap_or_else(|| {
      cli::default_command(&cfg)
    });
  let action = command
    .into_action(&cfg, session.today())?;

  commands::dispatch(
    &mut session,
    &mut renderer,
    action
  )?;

  info!("done");
  Ok(())
}
