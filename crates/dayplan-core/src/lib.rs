pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod density;
pub mod lifegrid;
pub mod planner;
pub mod render;
pub mod schedule;
pub mod scroll;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::density::peak_overlap;
pub use crate::lifegrid::build_life_grid;
pub use crate::schedule::{
  parse_clause,
  parse_schedule
};
pub use crate::scroll::scroll_offset;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dayplan CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.dayplanrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let wall_clock = clock::local_now();
  let now = match cli.now.as_deref() {
    | Some(expr) => {
      clock::parse_now_expr(
        expr, wall_clock
      )
      .context(
        "failed to parse --now"
      )?
    }
    | None => wall_clock
  };

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &cfg,
    &renderer,
    inv,
    commands::RunOptions {
      now,
      json: cli.json
    }
  )?;

  info!("done");
  Ok(())
}
