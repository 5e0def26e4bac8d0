use std::io::{self, Read};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::day::{Day, parse_day_expr};
use crate::error::CalendarError;
use crate::gesture::GestureOutcome;
use crate::gesture::SelectionGesture;
use crate::grid::YearGrid;
use crate::interval::{ExpandOptions, Interval};
use crate::interval_set::AddOutcome;
use crate::render::Renderer;
use crate::tag::{IntervalTag, ModeType, parse_custom_hours};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "remove", "toggle", "find", "list", "days", "grid", "set", "export", "clear",
        "press", "enter", "release", "cancel", "undo", "show", "help", "version",
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

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = Day::today();
    let command = inv.command.as_str();
    let args = inv.args.as_slice();

    debug!(command, ?args, %today, "dispatching command");

    match command {
        "add" => cmd_add(store, cfg, args, today),
        "remove" => cmd_remove(store, args),
        "toggle" => cmd_toggle(store, cfg, args, today),
        "find" => cmd_find(store, args, today),
        "list" => cmd_list(store, renderer),
        "days" => cmd_days(store, renderer, args),
        "grid" => cmd_grid(store, renderer, args, today),
        "set" => cmd_set(store, cfg),
        "export" => cmd_export(store),
        "clear" => cmd_clear(store),
        "press" => cmd_press(store, args, today),
        "enter" => cmd_enter(store, args, today),
        "release" => cmd_release(store, cfg, args, today),
        "cancel" => cmd_cancel(store),
        "undo" => cmd_undo(store),
        "show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, cfg, args))]
fn cmd_add(store: &mut DataStore, cfg: &Config, args: &[String], today: Day) -> anyhow::Result<()> {
    info!("command add");

    let (days, tag) = parse_days_and_tag(cfg, args, today)?;
    let (start, end) = match days.as_slice() {
        [start] => (*start, *start),
        [start, end] => (*start, *end),
        [] => return Err(anyhow!("add requires a start day")),
        _ => return Err(anyhow!("add takes at most two days, got {}", days.len())),
    };

    let capacity = cfg.capacity()?;
    let mut set = store.load_intervals()?;
    let before = set.clone();

    let outcome = set.add(Interval::new(start, end, tag), &capacity)?;
    store.commit(&before, &set)?;

    report_added(&outcome);
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_remove(store: &mut DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command remove");

    let raw = args
        .first()
        .ok_or_else(|| anyhow!("remove requires an interval number"))?;
    let index = parse_index(raw)?;

    let mut set = store.load_intervals()?;
    let before = set.clone();
    let removed = set.remove(index)?;
    store.commit(&before, &set)?;

    println!("Removed interval {} ({removed}).", index + 1);
    Ok(())
}

#[instrument(skip(store, cfg, args))]
fn cmd_toggle(
    store: &mut DataStore,
    cfg: &Config,
    args: &[String],
    today: Day,
) -> anyhow::Result<()> {
    info!("command toggle");

    let day = single_day_arg("toggle", args, today)?;
    let tag = cfg.default_tag()?;
    let capacity = cfg.capacity()?;
    let mut set = store.load_intervals()?;
    let before = set.clone();

    let mut gesture = SelectionGesture::new();
    gesture.press(day);
    let outcome = gesture.release(day, &mut set, tag, &capacity)?;
    store.commit(&before, &set)?;

    report_gesture(&outcome);
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_find(store: &mut DataStore, args: &[String], today: Day) -> anyhow::Result<()> {
    info!("command find");

    let day = single_day_arg("find", args, today)?;
    let set = store.load_intervals()?;
    match set.find_containing(day) {
        Some(index) => {
            let interval = set
                .get(index)
                .ok_or(CalendarError::IndexOutOfRange {
                    index,
                    len: set.len(),
                })?;
            println!(
                "{day} is in interval {} ({interval}, {}).",
                index + 1,
                interval.tag().label()
            );
        }
        None => println!("{day} is not active."),
    }
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_list(store: &mut DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command list");

    let set = store.load_intervals()?;
    if set.is_empty() {
        println!("No active intervals.");
        return Ok(());
    }

    renderer.print_interval_table(&set)?;
    println!();
    println!("{} interval(s)", set.len());
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_days(store: &mut DataStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command days");

    let raw = args
        .first()
        .ok_or_else(|| anyhow!("days requires an interval number"))?;
    let index = parse_index(raw)?;
    let options = match args.get(1) {
        Some(raw_year) => ExpandOptions::year(parse_year(raw_year)?),
        None => ExpandOptions::default(),
    };

    let set = store.load_intervals()?;
    let interval = set.get(index).ok_or(CalendarError::IndexOutOfRange {
        index,
        len: set.len(),
    })?;

    let days: Vec<Day> = interval.expand_to_days(options).collect();
    if days.is_empty() {
        println!("No days of interval {} fall in that year.", index + 1);
        return Ok(());
    }
    renderer.print_days(days)
}

#[instrument(skip(store, renderer, args))]
fn cmd_grid(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: Day,
) -> anyhow::Result<()> {
    info!("command grid");

    let year = match args.first() {
        Some(raw) => parse_year(raw)?,
        None => today.year(),
    };
    let grid = YearGrid::build(year)?;
    let set = store.load_intervals()?;
    renderer.print_grid(&grid, &set, Some(today))
}

#[derive(Debug, Deserialize)]
struct IncomingInterval {
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    tag: Option<IntervalTag>,
}

#[instrument(skip(store, cfg))]
fn cmd_set(store: &mut DataStore, cfg: &Config) -> anyhow::Result<()> {
    info!("command set");

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let intervals = parse_incoming_intervals(&stdin, cfg.default_tag()?)?;

    let mut set = store.load_intervals()?;
    let before = set.clone();
    set.replace_all(intervals);
    store.commit(&before, &set)?;

    println!("Selection replaced with {} interval(s).", set.len());
    Ok(())
}

fn parse_incoming_intervals(raw: &str, default_tag: IntervalTag) -> anyhow::Result<Vec<Interval>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("set: empty input"));
    }

    let items: Vec<IncomingInterval> =
        serde_json::from_str(trimmed).context("failed parsing JSON array of intervals")?;

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let end = item.end.as_deref().unwrap_or(&item.start);
        let interval = Interval::parse(&item.start, end, item.tag.unwrap_or(default_tag))
            .with_context(|| format!("interval {} is invalid", idx + 1))?;
        out.push(interval);
    }
    Ok(out)
}

#[instrument(skip(store))]
fn cmd_export(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command export");

    let set = store.load_intervals()?;
    println!("{}", serde_json::to_string_pretty(&set)?);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_clear(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command clear");

    let mut set = store.load_intervals()?;
    let before = set.clone();
    set.clear();
    store.commit(&before, &set)?;

    println!("Cleared {} interval(s).", before.len());
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_press(store: &mut DataStore, args: &[String], today: Day) -> anyhow::Result<()> {
    info!("command press");

    let day = single_day_arg("press", args, today)?;
    let mut gesture = store.load_gesture()?;
    if !gesture.press(day) {
        println!("A gesture is already in progress; release or cancel it first.");
        return Ok(());
    }
    store.save_gesture(&gesture)?;

    println!("Pressed {day}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_enter(store: &mut DataStore, args: &[String], today: Day) -> anyhow::Result<()> {
    info!("command enter");

    let day = single_day_arg("enter", args, today)?;
    let mut gesture = store.load_gesture()?;
    let Some(preview) = gesture.enter(day) else {
        println!("No gesture in progress.");
        return Ok(());
    };
    store.save_gesture(&gesture)?;

    let (from, to) = preview.paint;
    println!("Selecting {from}..{to}.");
    Ok(())
}

#[instrument(skip(store, cfg, args))]
fn cmd_release(
    store: &mut DataStore,
    cfg: &Config,
    args: &[String],
    today: Day,
) -> anyhow::Result<()> {
    info!("command release");

    let day = single_day_arg("release", args, today)?;
    let tag = cfg.default_tag()?;
    let capacity = cfg.capacity()?;
    let mut gesture = store.load_gesture()?;
    if gesture.is_idle() {
        debug!(%day, "release without a persisted press");
    }

    let mut set = store.load_intervals()?;
    let before = set.clone();
    let result = gesture.release(day, &mut set, tag, &capacity);
    store.save_gesture(&gesture)?;
    let outcome = result?;
    store.commit(&before, &set)?;

    report_gesture(&outcome);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_cancel(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command cancel");

    let mut gesture = store.load_gesture()?;
    if gesture.is_idle() {
        println!("No gesture in progress.");
        return Ok(());
    }
    let previewed = gesture.cancel();
    store.save_gesture(&gesture)?;

    match previewed {
        Some((from, to)) => println!("Cancelled selection of {from}..{to}."),
        None => println!("Cancelled gesture."),
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_undo(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command undo");

    let Some(set) = store.pop_undo_snapshot()? else {
        println!("No undo transactions available.");
        return Ok(());
    };

    store.save_intervals(&set)?;

    println!("Undo completed.");
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        println!("# loaded {}", path.display());
    }
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Usage: daysel [OPTIONS] [rc.KEY=VALUE]... [COMMAND [ARGS...]]");
    println!();
    println!("  add START [END] [type:T] [hours:H]   select a range of days");
    println!("  remove N                             drop interval N");
    println!("  toggle DAY                           click a day on or off");
    println!("  find DAY                             show the interval holding DAY");
    println!("  list                                 list active intervals");
    println!("  days N [YEAR]                        list the days of interval N");
    println!("  grid [YEAR]                          draw the year calendar");
    println!("  set                                  replace all intervals from JSON on stdin");
    println!("  export                               print intervals as JSON");
    println!("  clear                                drop every interval");
    println!("  press|enter|release DAY, cancel      drag a selection step by step");
    println!("  undo                                 revert the last change");
    println!("  show                                 print effective configuration");
    println!();
    println!("Days: today, tomorrow, yesterday, +Nd, -Nw, monday, march, YYYY-MM-DD");
    Ok(())
}

/// Splits `add` arguments into day expressions and `type:`/`hours:`
/// modifiers. `hours:` alone implies a custom-hours interval.
fn parse_days_and_tag(
    cfg: &Config,
    args: &[String],
    today: Day,
) -> anyhow::Result<(Vec<Day>, IntervalTag)> {
    let mut days = Vec::new();
    let mut kind: Option<ModeType> = None;
    let mut hours: Option<f64> = None;

    for arg in args {
        if let Some(raw) = arg.strip_prefix("type:") {
            kind = Some(raw.parse()?);
        } else if let Some(raw) = arg.strip_prefix("hours:") {
            hours = Some(parse_custom_hours(raw)?);
        } else {
            days.push(parse_day_expr(arg, today)?);
        }
    }

    let tag = match (kind, hours) {
        (None, None) => cfg.default_tag()?,
        (Some(ModeType::CustomHours) | None, Some(hours)) => IntervalTag::custom(hours)?,
        (Some(kind), Some(_)) => {
            return Err(anyhow!("hours: only applies to {}, not {kind}", ModeType::CustomHours));
        }
        (Some(kind), None) => cfg.tag_for(kind)?,
    };

    if let Ok(mode) = cfg.mode()
        && tag.kind.mode() != mode
    {
        warn!(kind = %tag.kind, ?mode, "interval type does not belong to the configured mode");
    }

    Ok((days, tag))
}

fn single_day_arg(command: &str, args: &[String], today: Day) -> anyhow::Result<Day> {
    match args {
        [raw] => parse_day_expr(raw, today),
        [] => Err(anyhow!("{command} requires a day")),
        _ => Err(anyhow!("{command} takes a single day")),
    }
}

/// Converts a 1-based interval number into an index.
fn parse_index(raw: &str) -> anyhow::Result<usize> {
    let number: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid interval number: {raw}"))?;
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("interval numbers start at 1"))
}

fn parse_year(raw: &str) -> anyhow::Result<i32> {
    let year: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid year: {raw}"))?;
    if Day::first_of_year(year).is_none() {
        return Err(anyhow!("year out of range: {year}"));
    }
    Ok(year)
}

fn report_added(outcome: &AddOutcome) {
    println!("Added {} ({}).", outcome.merged, outcome.merged.tag().label());
    if !outcome.absorbed.is_empty() {
        println!("Merged {} touching interval(s).", outcome.absorbed.len());
    }
    for evicted in &outcome.evicted {
        println!("Evicted {evicted} to stay within max.active.");
    }
}

fn report_gesture(outcome: &GestureOutcome) {
    match outcome {
        GestureOutcome::Added(added) => report_added(added),
        GestureOutcome::Removed { index, interval } => {
            println!("Removed interval {} ({interval}).", index + 1);
        }
    }
}
