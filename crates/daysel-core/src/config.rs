use std::collections::BTreeMap;
use std::fs;
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

use crate::interval_set::{
  Capacity,
  OverflowPolicy
};
use crate::tag::{
  CalendarMode,
  IntervalTag,
  ModeType,
  parse_custom_hours
};

const RC_ENV_VAR: &str = "DAYSELRC";
const RC_FILE_NAME: &str = ".dayselrc";
const DATA_DIR_NAME: &str = ".daysel";

#[derive(Debug, Clone)]
pub struct Config {
  map:              BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    map.insert(
      "data.location".to_string(),
      format!("~/{DATA_DIR_NAME}")
    );
    map.insert(
      "overflow".to_string(),
      OverflowPolicy::EvictOldest
        .to_string()
    );
    map.insert(
      "mode".to_string(),
      "days".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
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

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no rc file found; using \
         defaults"
      );
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

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// Maximum number of concurrent intervals and what to do past it.
  pub fn capacity(
    &self
  ) -> anyhow::Result<Capacity> {
    let max_concurrent = match self
      .map
      .get("max.active")
      .map(|raw| raw.trim())
      .filter(|raw| !raw.is_empty())
    {
      | Some(raw) => {
        Some(raw.parse::<usize>().with_context(|| {
          format!("invalid max.active value: {raw}")
        })?)
      }
      | None => None
    };

    let on_overflow = match self
      .map
      .get("overflow")
    {
      | Some(raw) => raw.parse()?,
      | None => OverflowPolicy::default()
    };

    Ok(Capacity {
      max_concurrent,
      on_overflow
    })
  }

  pub fn mode(
    &self
  ) -> anyhow::Result<CalendarMode> {
    match self.map.get("mode") {
      | Some(raw) => raw.parse(),
      | None => {
        Ok(CalendarMode::default())
      }
    }
  }

  /// Tag given to new intervals: `type` if set, otherwise the first type
  /// of the configured mode.
  pub fn default_tag(
    &self
  ) -> anyhow::Result<IntervalTag> {
    let mode = self.mode()?;
    let kind = match self.map.get("type")
    {
      | Some(raw) => {
        raw.parse::<ModeType>()?
      }
      | None => mode.default_type()
    };

    if kind.mode() != mode {
      return Err(anyhow!(
        "type {kind} does not belong \
         to mode {mode:?}"
      ));
    }

    self.tag_for(kind)
  }

  /// Builds the tag for `kind`, reading `custom.hours` when it needs one.
  pub fn tag_for(
    &self,
    kind: ModeType
  ) -> anyhow::Result<IntervalTag> {
    if kind != ModeType::CustomHours {
      return Ok(IntervalTag::new(kind));
    }

    let raw = self
      .map
      .get("custom.hours")
      .ok_or_else(|| {
        anyhow!(
          "type CUSTOM_HOURS needs \
           custom.hours to be set"
        )
      })?;
    let hours = parse_custom_hours(raw)?;
    Ok(IntervalTag::custom(hours)?)
  }

  /// ANSI code configured for `kind` through `color.<TYPE>`.
  pub fn color_override(
    &self,
    kind: ModeType
  ) -> Option<String> {
    self.get(&format!(
      "color.{}",
      kind.as_str()
    ))
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

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

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
        debug!(
          file = %path.display(),
          include = %include_path.display(),
          line = line_num + 1,
          "processing include"
        );

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
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
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
    warn!(
      "cannot determine home \
       directory; skipping {RC_FILE_NAME}"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(DATA_DIR_NAME))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
