use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::{Context, anyhow};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::density::{EventStatus, HOURS_PER_DAY, Layout};
use crate::lifegrid::{LifeGrid, LifeGridError, LifeProgress};
use crate::schedule::{Event, ParseError};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const ELAPSED_DOT: char = '●';
const REMAINING_DOT: char = '○';

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn write_json<W: Write, T: Serialize>(&self, out: &mut W, value: &T) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize output")?;
        writeln!(out)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, events, statuses))]
    pub fn write_events<W: Write>(
        &self,
        out: &mut W,
        events: &[Event],
        statuses: &[EventStatus],
    ) -> anyhow::Result<()> {
        if events.is_empty() {
            writeln!(out, "No events.")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Title".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Now".to_string(),
        ];

        let rows = events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                let now = match statuses.get(idx) {
                    Some(status) if status.current => {
                        self.paint(&format!("{:.0}%", status.progress_percent), "32")
                    }
                    _ => String::new(),
                };
                vec![
                    self.paint(&(idx + 1).to_string(), "33"),
                    event.title.clone(),
                    event.start.format(TIME_FORMAT).to_string(),
                    event.end.format(TIME_FORMAT).to_string(),
                    now,
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, errors))]
    pub fn write_errors<W: Write>(&self, out: &mut W, errors: &[ParseError]) -> anyhow::Result<()> {
        for err in errors {
            writeln!(
                out,
                "{} `{}`: {}",
                self.paint("could not parse", "31"),
                err.raw_clause,
                err.reason
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, counts, layout))]
    pub fn write_density<W: Write>(
        &self,
        out: &mut W,
        counts: &BTreeMap<u32, usize>,
        layout: &Layout,
    ) -> anyhow::Result<()> {
        for hour in 0..HOURS_PER_DAY {
            let count = counts.get(&hour).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            let bar = "#".repeat(count);
            let bar = if count == layout.peak_overlap {
                self.paint(&bar, "35")
            } else {
                bar
            };
            writeln!(out, "{hour:02}:00 {count:>3} {bar}")?;
        }

        writeln!(out, "peak overlap  {}", layout.peak_overlap)?;
        writeln!(out, "grid height   {:.0}px", layout.total_height)?;
        writeln!(out, "hour height   {:.1}px", layout.row_height)?;
        writeln!(out, "font scale    {:.2}", layout.font_scale)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, grid), fields(unit = grid.unit.name()))]
    pub fn write_life_grid<W: Write>(&self, out: &mut W, grid: &LifeGrid) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} lifespan, born {}, expected until {}",
            grid.lifespan,
            grid.birthdate,
            grid.expected_death
        )?;

        for row in grid.grid_rows() {
            let line: String = row
                .iter()
                .map(|cell| if cell.elapsed { ELAPSED_DOT } else { REMAINING_DOT })
                .collect();
            writeln!(out, "{line}")?;
        }

        let readout = match grid.progress() {
            LifeProgress::Living { percent } => format!(
                "{} of {} {}s lived ({percent:.4}%)",
                grid.elapsed_units,
                grid.total_units,
                grid.unit.name()
            ),
            LifeProgress::Exceeded => self.paint(
                &format!(
                    "lifespan exceeded: {} of {} {}s",
                    grid.elapsed_units,
                    grid.total_units,
                    grid.unit.name()
                ),
                "31",
            ),
        };
        writeln!(out, "{readout}")?;
        Ok(())
    }

    /// Prompts ("enter your birthday") and validation messages share this.
    pub fn write_life_message<W: Write>(&self, out: &mut W, err: &LifeGridError) -> anyhow::Result<()> {
        if err.is_prompt() {
            writeln!(out, "Please {err}.")?;
        } else {
            writeln!(out, "{}", self.paint(&err.to_string(), "31"))?;
        }
        Ok(())
    }

    pub fn write_scroll<W: Write>(
        &self,
        out: &mut W,
        offset: f64,
        clamped: f64,
        grid_height: f64,
    ) -> anyhow::Result<()> {
        writeln!(out, "grid height   {grid_height:.0}px")?;
        writeln!(out, "offset        {offset:.1}px")?;
        writeln!(out, "scroll to     {clamped:.1}px")?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Renderer, strip_ansi, write_table};
    use crate::lifegrid::{LifeGridError, LifeUnit, Lifespan, build_life_grid};

    #[test]
    fn table_pads_wide_characters() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["日本".to_string(), "x".to_string()]],
        )
        .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[2], "日本 x ");
    }

    #[test]
    fn strips_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }

    #[test]
    fn life_grid_prints_one_line_per_row() {
        let now = NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid now");
        let grid = build_life_grid("2000-01-01", Some(Lifespan::Healthy), LifeUnit::Week, now)
            .expect("build grid");

        let mut buf = Vec::new();
        Renderer::plain().write_life_grid(&mut buf, &grid).expect("write grid");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        // header + 80 rows + readout
        assert_eq!(lines.len(), 82);
        assert_eq!(lines[1].chars().count(), 52);
        assert!(lines[81].starts_with("1043 of 4160 weeks lived"));
    }

    #[test]
    fn prompts_are_not_errors() {
        let mut buf = Vec::new();
        Renderer::plain()
            .write_life_message(&mut buf, &LifeGridError::MissingLifespanSelection)
            .expect("write message");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "Please select a lifespan option.\n");
    }
}
