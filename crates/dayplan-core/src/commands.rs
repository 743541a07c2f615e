use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::clock::reference_date;
use crate::config::Config;
use crate::density::{EventStatus, Layout, hour_counts};
use crate::lifegrid::{LifeGrid, LifeGridError, LifeProgress, LifeUnit, Lifespan};
use crate::planner::{DayPlanner, LayoutSettings, LifeSelection};
use crate::render::Renderer;
use crate::schedule::{Event, ParseError};
use crate::scroll::{clamp_scroll, scroll_offset};

/// Per-run inputs that do not come from the rc file.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub now: NaiveDateTime,
    pub json: bool,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "parse",
        "tomorrow",
        "repeat",
        "density",
        "life",
        "scroll",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(cfg, renderer, inv, opts), fields(command = %inv.command))]
pub fn dispatch(
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    opts: RunOptions,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(
        command,
        args = ?inv.command_args,
        now = %opts.now,
        json = opts.json,
        "dispatching command"
    );

    let mut out = io::stdout().lock();
    match command {
        "parse" => cmd_parse(&mut out, cfg, renderer, &inv.command_args, "today", opts),
        "tomorrow" => cmd_parse(&mut out, cfg, renderer, &inv.command_args, "tomorrow", opts),
        "repeat" => cmd_repeat(&mut out, cfg, renderer, &inv.command_args, opts),
        "density" => cmd_density(&mut out, cfg, renderer, &inv.command_args, opts),
        "life" => cmd_life(&mut out, cfg, renderer, &inv.command_args, opts),
        "scroll" => cmd_scroll(&mut out, cfg, renderer, &inv.command_args, opts),
        "_commands" => cmd_commands(&mut out),
        "_show" => cmd_show(&mut out, cfg),
        "help" => cmd_help(&mut out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[derive(Debug, Serialize)]
struct ScheduleOutput<'a> {
    reference: NaiveDate,
    events: &'a [Event],
    statuses: &'a [EventStatus],
    errors: &'a [ParseError],
    layout: Layout,
}

fn planner_for(cfg: &Config) -> anyhow::Result<DayPlanner> {
    let settings = LayoutSettings::from_config(cfg).context("invalid layout settings")?;
    Ok(DayPlanner::new(settings))
}

fn write_schedule<W: Write>(
    out: &mut W,
    renderer: &Renderer,
    planner: &DayPlanner,
    reference: NaiveDate,
    opts: RunOptions,
) -> anyhow::Result<()> {
    let frame = planner.refresh(opts.now);
    if opts.json {
        return renderer.write_json(
            out,
            &ScheduleOutput {
                reference,
                events: planner.events(),
                statuses: &frame.statuses,
                errors: planner.last_errors(),
                layout: frame.layout,
            },
        );
    }

    renderer.write_events(out, planner.events(), &frame.statuses)?;
    renderer.write_errors(out, planner.last_errors())
}

#[instrument(skip(out, cfg, renderer, args, opts))]
fn cmd_parse<W: Write>(
    out: &mut W,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    day: &str,
    opts: RunOptions,
) -> anyhow::Result<()> {
    let reference = reference_date(day, opts.now)?;
    let text = args.join(" ");
    let mut planner = planner_for(cfg)?;
    planner.commit(&text, reference);

    info!(
        events = planner.events().len(),
        errors = planner.last_errors().len(),
        %reference,
        "parsed schedule"
    );
    write_schedule(out, renderer, &planner, reference, opts)
}

#[instrument(skip(out, cfg, renderer, args, opts))]
fn cmd_repeat<W: Write>(
    out: &mut W,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    opts: RunOptions,
) -> anyhow::Result<()> {
    let today = reference_date("today", opts.now)?;
    let mut planner = planner_for(cfg)?;
    planner.commit(&args.join(" "), today);
    let added = planner.repeat_tomorrow(today);
    info!(added, "duplicated events onto tomorrow");
    write_schedule(out, renderer, &planner, today, opts)
}

#[derive(Debug, Serialize)]
struct DensityOutput<'a> {
    hours: BTreeMap<u32, usize>,
    layout: Layout,
    errors: &'a [ParseError],
}

#[instrument(skip(out, cfg, renderer, args, opts))]
fn cmd_density<W: Write>(
    out: &mut W,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    opts: RunOptions,
) -> anyhow::Result<()> {
    let today = reference_date("today", opts.now)?;
    let mut planner = planner_for(cfg)?;
    planner.commit(&args.join(" "), today);

    let hours = hour_counts(planner.events());
    let layout = planner.layout();
    if opts.json {
        return renderer.write_json(
            out,
            &DensityOutput {
                hours,
                layout,
                errors: planner.last_errors(),
            },
        );
    }

    renderer.write_density(out, &hours, &layout)?;
    renderer.write_errors(out, planner.last_errors())
}

#[derive(Debug, Serialize)]
struct LifeOutput<'a> {
    selection: &'a LifeSelection,
    grid: Option<&'a LifeGrid>,
    progress: Option<LifeProgress>,
    message: Option<&'a LifeGridError>,
}

/// Unknown lifespan names fall back to "not selected" so the caller gets a
/// prompt rather than a hard failure.
fn lifespan_selection(raw: Option<String>) -> Option<Lifespan> {
    let raw = raw?;
    match raw.parse::<Lifespan>() {
        Ok(lifespan) => Some(lifespan),
        Err(_) => {
            warn!(lifespan = %raw, "unknown lifespan option");
            None
        }
    }
}

#[instrument(skip(out, cfg, renderer, args, opts))]
fn cmd_life<W: Write>(
    out: &mut W,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    opts: RunOptions,
) -> anyhow::Result<()> {
    let birthdate = args.first().cloned().unwrap_or_default();
    let lifespan = lifespan_selection(args.get(1).cloned().or_else(|| cfg.get("life.lifespan")));
    let unit = match args.get(2) {
        Some(raw) => raw.parse::<LifeUnit>()?,
        None => cfg
            .get_parsed::<LifeUnit>("life.unit")?
            .unwrap_or(LifeUnit::Week),
    };

    let mut planner = planner_for(cfg)?;
    planner.set_life(LifeSelection {
        birthdate,
        lifespan,
        unit,
    });
    let frame = planner.refresh(opts.now);

    if opts.json {
        return renderer.write_json(
            out,
            &LifeOutput {
                selection: planner.life(),
                grid: frame.life.as_ref().ok(),
                progress: frame.life.as_ref().ok().map(LifeGrid::progress),
                message: frame.life.as_ref().err(),
            },
        );
    }

    match &frame.life {
        Ok(grid) => renderer.write_life_grid(out, grid),
        Err(err) => {
            debug!(error = %err, prompt = err.is_prompt(), "no life grid");
            renderer.write_life_message(out, err)
        }
    }
}

#[derive(Debug, Serialize)]
struct ScrollOutput {
    now: NaiveDateTime,
    grid_height: f64,
    viewport_height: f64,
    offset: f64,
    clamped: f64,
}

fn parse_pixels(raw: &str, what: &str) -> anyhow::Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {what}: {raw}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("{what} must be a non-negative number, got {raw}"));
    }
    Ok(value)
}

#[instrument(skip(out, cfg, renderer, args, opts))]
fn cmd_scroll<W: Write>(
    out: &mut W,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    opts: RunOptions,
) -> anyhow::Result<()> {
    let mut planner = planner_for(cfg)?;
    planner.set_locked_to_now(true);
    let settings = planner.settings();

    let viewport_height = match args.get(1) {
        Some(raw) => parse_pixels(raw, "viewport height")?,
        None => settings.viewport_height,
    };
    let (grid_height, offset) = match args.first() {
        Some(raw) => {
            let grid_height = parse_pixels(raw, "grid height")?;
            (grid_height, scroll_offset(opts.now, grid_height, viewport_height))
        }
        None => {
            let frame = planner.refresh(opts.now);
            let offset = frame
                .scroll_offset
                .ok_or_else(|| anyhow!("lock-to-now produced no scroll offset"))?;
            (frame.layout.total_height, offset)
        }
    };
    let clamped = clamp_scroll(offset, grid_height, viewport_height);

    if opts.json {
        return renderer.write_json(
            out,
            &ScrollOutput {
                now: opts.now,
                grid_height,
                viewport_height,
                offset,
                clamped,
            },
        );
    }
    renderer.write_scroll(out, offset, clamped, grid_height)
}

fn cmd_commands<W: Write>(out: &mut W) -> anyhow::Result<()> {
    for name in known_command_names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn cmd_show<W: Write>(out: &mut W, cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        writeln!(out, "{key}={value}")?;
    }
    for file in &cfg.loaded_files {
        writeln!(out, "# loaded {}", file.display())?;
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    let lifespans = Lifespan::ALL
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        out,
        "dayplan [--now EXPR] [--json] [rc.KEY=VALUE] <command> [args]\n\
         \n\
         commands:\n\
         \x20 parse <text>                     events for today, e.g. \"Meeting 9:00-10:00 am; Lunch 12:00-1:00 pm\"\n\
         \x20 tomorrow <text>                  same, placed on tomorrow\n\
         \x20 repeat <text>                    parse for today and copy onto tomorrow\n\
         \x20 density <text>                   per-hour overlap and calendar sizing\n\
         \x20 life <birthdate> [lifespan] [unit]  life calendar (unit: week or day)\n\
         \x20 scroll [grid_px] [viewport_px]   lock-to-now scroll offset\n\
         \x20 _commands | _show | help | version\n\
         \n\
         lifespans: {lifespans}"
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{RunOptions, cmd_density, cmd_life, cmd_parse, cmd_scroll, expand_command_abbrev, known_command_names};
    use crate::config::Config;
    use crate::render::Renderer;

    fn opts(json: bool) -> RunOptions {
        RunOptions {
            now: NaiveDate::from_ymd_opt(2026, 3, 10)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .expect("valid now"),
            json,
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ambiguous_prefix_does_not_expand() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("li", &known), Some("life"));
        assert_eq!(expand_command_abbrev("_", &known), None);
    }

    #[test]
    fn parse_json_reports_events_and_errors() {
        let mut buf = Vec::new();
        cmd_parse(
            &mut buf,
            &Config::default(),
            &Renderer::plain(),
            &args(&["Lunch", "12:00-1:00", "pm;", "oops"]),
            "today",
            opts(true),
        )
        .expect("parse command");

        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["events"][0]["title"], "Lunch");
        assert_eq!(value["events"][0]["start"], "2026-03-10T12:00:00");
        assert_eq!(value["statuses"][0]["current"], true);
        assert_eq!(value["errors"][0]["raw_clause"], "oops");
        assert_eq!(value["layout"]["peak_overlap"], 1);
    }

    #[test]
    fn tomorrow_moves_reference_date() {
        let mut buf = Vec::new();
        cmd_parse(
            &mut buf,
            &Config::default(),
            &Renderer::plain(),
            &args(&["Run 6:00-7:00 am"]),
            "tomorrow",
            opts(true),
        )
        .expect("parse command");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["reference"], "2026-03-11");
        assert_eq!(value["events"][0]["end"], "2026-03-11T07:00:00");
    }

    #[test]
    fn density_table_lists_peak() {
        let mut buf = Vec::new();
        cmd_density(
            &mut buf,
            &Config::default(),
            &Renderer::plain(),
            &args(&["A 9:00-10:00 am; B 10:00-11:00 am"]),
            opts(false),
        )
        .expect("density command");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("10:00   2 ##"));
        assert!(text.contains("peak overlap  2"));
        assert!(text.contains("grid height   4900px"));
    }

    #[test]
    fn life_without_selection_prompts() {
        let mut buf = Vec::new();
        cmd_life(
            &mut buf,
            &Config::default(),
            &Renderer::plain(),
            &args(&["2000-01-01"]),
            opts(false),
        )
        .expect("life command");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "Please select a lifespan option.\n");
    }

    #[test]
    fn life_uses_configured_lifespan() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("rc.life.lifespan".to_string(), "healthy".to_string())]);
        let mut buf = Vec::new();
        cmd_life(&mut buf, &cfg, &Renderer::plain(), &args(&["2000-01-01"]), opts(true))
            .expect("life command");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["grid"]["total_units"], 4160);
        assert_eq!(value["progress"]["state"], "living");
        assert!(value["message"].is_null());
    }

    #[test]
    fn scroll_defaults_to_empty_day_grid() {
        let mut buf = Vec::new();
        cmd_scroll(&mut buf, &Config::default(), &Renderer::plain(), &[], opts(true))
            .expect("scroll command");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["grid_height"], 4800.0);
        assert_eq!(value["offset"], 2100.0);
        assert_eq!(value["clamped"], 2100.0);
    }

    #[test]
    fn scroll_rejects_negative_heights() {
        let mut buf = Vec::new();
        assert!(
            cmd_scroll(&mut buf, &Config::default(), &Renderer::plain(), &args(&["-10"]), opts(false))
                .is_err()
        );
    }
}
