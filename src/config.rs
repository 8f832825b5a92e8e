use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::source::DEFAULT_ENDPOINT;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "breedsearch";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from; `None` when running on defaults.
    pub config_path: Option<PathBuf>,
    pub endpoint: String,
    pub keys: Keys,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            keys: Keys::default(),
            ui: UiFile::default().into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    pub pane: UiPane,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone)]
pub struct UiPane {
    pub image: UiPaneImage,
}

#[derive(Debug, Clone)]
pub struct UiPaneImage {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RgbColorFile")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Keys that work everywhere outside the help popup
    pub global: GlobalKeys,
    /// Keys for the search input and its suggestion dropdown
    pub search: SearchKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchKeys {
    /// Run the search, or pick the highlighted suggestion
    pub confirm: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    /// Close the suggestion dropdown
    pub dismiss: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["Escape".into()],
            help: vec!["F1".into()],
        }
    }
}

impl Default for SearchKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into()],
            next: vec!["Down".into(), "Tab".into()],
            prev: vec!["Up".into(), "Backtab".into()],
            dismiss: vec!["Escape".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    search: SearchKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchKeysFile {
    confirm: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    dismiss: KeyBinding,
}

impl Default for SearchKeysFile {
    fn default() -> Self {
        let defaults = SearchKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            dismiss: KeyBinding::Multiple(defaults.dismiss),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                help: file.global.help.into_vec(),
            },
            search: SearchKeys {
                confirm: file.search.confirm.into_vec(),
                next: file.search.next.into_vec(),
                prev: file.search.prev.into_vec(),
                dismiss: file.search.dismiss.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case; key names are case-insensitive.
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        match trimmed.to_ascii_lowercase().as_str() {
            "esc" => "escape".to_string(),
            "shift+tab" => "backtab".to_string(),
            "page_up" => "pageup".to_string(),
            "page_down" => "pagedown".to_string(),
            other => other.to_string(),
        }
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// The search input always has focus, so typeable keys must reach it.
fn check_typeable_keys(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.chars().count() == 1 || normalized == "space" {
                bail!(
                    "key binding '{}' for '{}' in [keys.{}] is a typeable character; use a named key such as F2 or Escape",
                    key.trim(),
                    action_name,
                    context_name
                );
            }
        }
    }

    Ok(())
}

fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global: [(&str, &[String]); 2] =
        [("quit", &keys.global.quit), ("help", &keys.global.help)];
    let search: [(&str, &[String]); 4] = [
        ("confirm", &keys.search.confirm),
        ("next", &keys.search.next),
        ("prev", &keys.search.prev),
        ("dismiss", &keys.search.dismiss),
    ];

    check_typeable_keys(&global, "global")?;
    check_typeable_keys(&search, "search")?;
    check_context_collisions(&global, "global")?;
    check_context_collisions(&search, "search")?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    endpoint: Option<String>,
    keys: KeysFile,
    ui: UiFile,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    pane: UiPaneFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(204, 102, 52),
            selection_bg: RgbColor::new(204, 102, 52),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(204, 102, 52),
            status_fg: RgbColor::new(204, 102, 52),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiPaneFile {
    image: UiPaneImageFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiPaneImageFile {
    width: u16,
    height: u16,
}

const DEFAULT_IMAGE_WIDTH: u16 = 30;
const DEFAULT_IMAGE_HEIGHT: u16 = 14;

impl Default for UiPaneImageFile {
    fn default() -> Self {
        Self {
            width: DEFAULT_IMAGE_WIDTH,
            height: DEFAULT_IMAGE_HEIGHT,
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let width = if file.pane.image.width == 0 {
            DEFAULT_IMAGE_WIDTH
        } else {
            file.pane.image.width
        };
        let height = if file.pane.image.height == 0 {
            DEFAULT_IMAGE_HEIGHT
        } else {
            file.pane.image.height
        };
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
            pane: UiPane {
                image: UiPaneImage { width, height },
            },
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                debug!(path = %path.display(), "no configuration file, using defaults");
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    parse(&raw, Some(path))
}

/// Parse configuration text. `path` is only recorded and used in messages.
pub fn parse(raw: &str, path: Option<PathBuf>) -> Result<Config> {
    let origin = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string());

    let value: toml::Value =
        toml::from_str(raw).with_context(|| format!("failed to parse {} as TOML", origin))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", origin))?;

    let endpoint = match cfg_file.endpoint {
        Some(endpoint) => {
            let trimmed = endpoint.trim();
            if trimmed.is_empty() {
                bail!("`endpoint` must not be empty");
            }
            trimmed.to_string()
        }
        None => DEFAULT_ENDPOINT.to_string(),
    };

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: path,
        endpoint,
        keys,
        ui: cfg_file.ui.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["endpoint", "keys", "ui"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warn!("unknown configuration key `{}`", key);
        }
    }

    if let Some(keys) = table.get("keys").and_then(toml::Value::as_table) {
        for (context, entries) in keys {
            let known: &[&str] = match context.as_str() {
                "global" => &["quit", "help"],
                "search" => &["confirm", "next", "prev", "dismiss"],
                _ => {
                    warn!("unknown keys.* context `{}`", context);
                    continue;
                }
            };
            warn_unknown_in(entries, &format!("keys.{context}"), known);
        }
    }

    if let Some(ui) = table.get("ui") {
        warn_unknown_in(ui, "ui", &["colors", "pane"]);
        if let Some(colors) = ui.get("colors") {
            warn_unknown_in(
                colors,
                "ui.colors",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                ],
            );
        }
        if let Some(pane) = ui.get("pane") {
            warn_unknown_in(pane, "ui.pane", &["image"]);
            if let Some(image) = pane.get("image") {
                warn_unknown_in(image, "ui.pane.image", &["width", "height"]);
            }
        }
    }
}

fn warn_unknown_in(value: &toml::Value, section: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            warn!("unknown {}.* entry `{}`", section, key);
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// `[r, g, b]` or `{ r, g, b }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RgbColorFile {
    Triple([u8; 3]),
    Channels { r: u8, g: u8, b: u8 },
}

impl From<RgbColorFile> for RgbColor {
    fn from(file: RgbColorFile) -> Self {
        match file {
            RgbColorFile::Triple([r, g, b]) | RgbColorFile::Channels { r, g, b } => {
                Self::new(r, g, b)
            }
        }
    }
}
