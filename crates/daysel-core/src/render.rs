use std::collections::{BTreeMap, HashMap};
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::day::Day;
use crate::grid::YearGrid;
use crate::interval_set::IntervalSet;
use crate::tag::{IntervalTag, ModeType};

const MONTH_LABEL_WIDTH: usize = 10;
const TABLE_HEADERS: [&str; 5] = ["#", "Start", "End", "Days", "Type"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    palette: BTreeMap<ModeType, String>,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let palette = ModeType::ALL
            .into_iter()
            .map(|kind| {
                let code = cfg
                    .color_override(kind)
                    .unwrap_or_else(|| default_code(kind).to_string());
                (kind, code)
            })
            .collect();

        Ok(Self { color, palette })
    }

    #[tracing::instrument(skip(self, set))]
    pub fn print_interval_table(&mut self, set: &IntervalSet) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_interval_table(out, set)
    }

    /// Writes one row per interval, numbered from 1, with columns sized to
    /// their widest cell.
    pub fn write_interval_table<W: Write>(
        &self,
        mut writer: W,
        set: &IntervalSet,
    ) -> anyhow::Result<()> {
        let rows: Vec<[String; 5]> = set
            .iter()
            .enumerate()
            .map(|(idx, interval)| {
                [
                    (idx + 1).to_string(),
                    interval.start().to_string(),
                    interval.end().to_string(),
                    interval.len_days().to_string(),
                    interval.tag().label(),
                ]
            })
            .collect();

        let mut widths = TABLE_HEADERS.map(|header| header.width());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }

        for (header, width) in TABLE_HEADERS.iter().zip(widths) {
            write!(writer, "{} ", pad(header, width))?;
        }
        writeln!(writer)?;
        for width in widths {
            write!(writer, "{} ", "-".repeat(width))?;
        }
        writeln!(writer)?;

        for (row, interval) in rows.iter().zip(set.iter()) {
            for (column, (cell, width)) in row.iter().zip(widths).enumerate() {
                let padded = pad(cell, width);
                let text = match column {
                    0 => self.paint(&padded, "33"),
                    4 => self.paint_tag(&padded, interval.tag()),
                    _ => padded,
                };
                write!(writer, "{text} ")?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, days))]
    pub fn print_days<I>(&mut self, days: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = Day>,
    {
        let mut out = io::stdout().lock();
        for day in days {
            let line = format!("{day} {}", day.weekday());
            if day.is_weekend() {
                writeln!(out, "{}", self.paint(&line, "2"))?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, grid, set))]
    pub fn print_grid(
        &mut self,
        grid: &YearGrid,
        set: &IntervalSet,
        today: Option<Day>,
    ) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_grid(out, grid, set, today)
    }

    /// Writes the year as twelve rows of aligned day cells. Active days are
    /// coloured by tag, or bracketed when colour is off.
    pub fn write_grid<W: Write>(
        &self,
        mut writer: W,
        grid: &YearGrid,
        set: &IntervalSet,
        today: Option<Day>,
    ) -> anyhow::Result<()> {
        let active: HashMap<Day, IntervalTag> =
            set.active_days_in_year(grid.year).into_iter().collect();

        writeln!(writer, "{:^width$}", grid.year, width = MONTH_LABEL_WIDTH + grid.columns * 4)?;
        write!(writer, "{:width$}", "", width = MONTH_LABEL_WIDTH)?;
        for letter in grid.header_letters() {
            write!(writer, " {letter}  ")?;
        }
        writeln!(writer)?;

        for row in &grid.months {
            write!(writer, "{:<width$}", row.name, width = MONTH_LABEL_WIDTH)?;
            write!(writer, "{}", "    ".repeat(row.offset))?;
            for cell in &row.days {
                let number = cell.day.day();
                let text = match active.get(&cell.day) {
                    Some(tag) if self.use_color() => self.paint_tag(&format!(" {number:>2} "), tag),
                    Some(_) => format!("[{number:>2}]"),
                    None if Some(cell.day) == today => self.paint(&format!(" {number:>2} "), "4"),
                    None if cell.is_weekend => self.paint(&format!(" {number:>2} "), "2"),
                    None => format!(" {number:>2} "),
                };
                write!(writer, "{text}")?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    pub fn paint_tag(&self, text: &str, tag: &IntervalTag) -> String {
        let code = self
            .palette
            .get(&tag.kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_code(tag.kind));
        self.paint(text, code)
    }

    fn use_color(&self) -> bool {
        self.color && io::stdout().is_terminal()
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.use_color() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn default_code(kind: ModeType) -> &'static str {
    match kind {
        ModeType::FullDay => "30;42",
        ModeType::OnlyMorning => "30;43",
        ModeType::OnlyAfternoon => "30;46",
        ModeType::FullHours => "30;45",
        ModeType::HalfHours => "30;44",
        ModeType::CustomHours => "30;41",
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::interval_set::Capacity;

    fn plain_renderer() -> Renderer {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        Renderer::new(&cfg).expect("renderer")
    }

    #[test]
    fn grid_brackets_active_days_without_colour() {
        let grid = YearGrid::build(2026).expect("grid");
        let mut set = IntervalSet::new();
        let start = Day::new(2026, 0, 5).expect("valid day");
        let end = Day::new(2026, 0, 6).expect("valid day");
        set.add(Interval::new(start, end, IntervalTag::default()), &Capacity::UNBOUNDED)
            .expect("add");

        let mut buf = Vec::new();
        plain_renderer()
            .write_grid(&mut buf, &grid, &set, None)
            .expect("write grid");
        let text = String::from_utf8(buf).expect("utf8");

        let january = text
            .lines()
            .find(|line| line.starts_with("January"))
            .expect("january row");
        assert!(january.contains("[ 5][ 6]  7 "));
        assert!(!text.contains("[ 4]"));
        assert_eq!(text.lines().count(), 14);
    }

    #[test]
    fn interval_table_numbers_rows_from_one() {
        let mut set = IntervalSet::new();
        let start = Day::new(2026, 0, 5).expect("valid day");
        let end = Day::new(2026, 0, 9).expect("valid day");
        set.add(Interval::new(start, end, IntervalTag::default()), &Capacity::UNBOUNDED)
            .expect("add");

        let mut buf = Vec::new();
        plain_renderer()
            .write_interval_table(&mut buf, &set)
            .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Start      End        Days Type     ");
        assert_eq!(lines[1], "- ---------- ---------- ---- -------- ");
        assert_eq!(lines[2], "1 2026-01-05 2026-01-09 5    full day ");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn rejects_unknown_colour_setting() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }
}
