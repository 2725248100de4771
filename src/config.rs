//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then `config.json` in the XDG config
//! directory, then `FOLIO_*` environment variables, then the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use gio::prelude::*;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::gallery::SettlePolicy;
use crate::models::MANIFEST_PATH;

const APP_DIR: &str = "folio";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_TEXTURE_CACHE_MB: usize = 192;
const MIN_TEXTURE_CACHE_MB: usize = 32;
const MAX_TEXTURE_CACHE_MB: usize = 1024;
const MAX_DECODE_WORKERS: usize = 8;

pub const USAGE: &str = "\
Usage:
  folio [ROOT] [--link URL|#HASH] [--share-url URL]
  folio generate [ROOT] [--output PATH]

Options:
  --link URL|#HASH   open the linked image once the gallery has rendered
  --share-url URL    page URL used when sharing links
  --output PATH      where `generate` writes the manifest
                     (default: ROOT/data/gallery.json)
  -h, --help         print this help";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Directory containing `data/` and `images/`.
    pub root: PathBuf,
    /// Manifest path relative to the root.
    pub manifest: String,
    /// Page URL that shared links are built on. Defaults to the file URL of
    /// `<root>/index.html`.
    pub share_base_url: Option<String>,
    /// Link to open after the first render.
    #[serde(skip)]
    pub initial_link: Option<String>,
    /// Longest edge of grid thumbnails, in pixels.
    pub thumbnail_edge: u32,
    /// Longest edge of the lightbox image, in pixels.
    pub lightbox_edge: u32,
    pub decode_workers: usize,
    pub texture_cache_mb: usize,
    pub narrow_viewport_px: i32,
    pub settle_delay_ms: u64,
    pub narrow_settle_delay_ms: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        let settle = SettlePolicy::default();
        Self {
            root: PathBuf::from("."),
            manifest: MANIFEST_PATH.to_string(),
            share_base_url: None,
            initial_link: None,
            thumbnail_edge: 360,
            lightbox_edge: 2048,
            decode_workers: 2,
            texture_cache_mb: DEFAULT_TEXTURE_CACHE_MB,
            narrow_viewport_px: settle.narrow_viewport_px,
            settle_delay_ms: settle.delay.as_millis() as u64,
            narrow_settle_delay_ms: settle.narrow_delay.as_millis() as u64,
        }
    }
}

impl GalleryConfig {
    /// Defaults overlaid with the user's `config.json` and the environment.
    pub fn load() -> Self {
        let mut config = default_config_path()
            .map(|path| Self::from_file(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config.clamp();
        config
    }

    /// Reads a config file. A missing file means defaults; a broken one is
    /// logged and ignored.
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(?err, ?path, "failed to parse config.json; using defaults");
                Self::default()
            }),
            Err(err) => {
                warn!(?err, ?path, "failed to read config.json; using defaults");
                Self::default()
            }
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("FOLIO_ROOT").filter(|v| !v.trim().is_empty()) {
            self.root = PathBuf::from(root);
        }
        if let Some(url) = lookup("FOLIO_SHARE_URL").filter(|v| !v.trim().is_empty()) {
            self.share_base_url = Some(url);
        }
        if let Some(mb) = lookup("FOLIO_TEXTURE_CACHE_MB")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
        {
            self.texture_cache_mb = mb;
        }
        if let Some(workers) = lookup("FOLIO_DECODE_WORKERS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
        {
            self.decode_workers = workers;
        }
    }

    pub fn apply_browse_args(&mut self, args: BrowseArgs) {
        if let Some(root) = args.root {
            self.root = root;
        }
        if let Some(url) = args.share_url {
            self.share_base_url = Some(url);
        }
        self.initial_link = args.link;
    }

    fn clamp(&mut self) {
        self.texture_cache_mb = self
            .texture_cache_mb
            .clamp(MIN_TEXTURE_CACHE_MB, MAX_TEXTURE_CACHE_MB);
        self.decode_workers = self.decode_workers.clamp(1, MAX_DECODE_WORKERS);
        self.thumbnail_edge = self.thumbnail_edge.max(32);
        self.lightbox_edge = self.lightbox_edge.max(self.thumbnail_edge);
    }

    pub fn texture_cache_bytes(&self) -> usize {
        self.texture_cache_mb * 1024 * 1024
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            narrow_viewport_px: self.narrow_viewport_px,
            delay: Duration::from_millis(self.settle_delay_ms),
            narrow_delay: Duration::from_millis(self.narrow_settle_delay_ms),
        }
    }

    /// Page URL shared links are built on.
    pub fn page_url(&self) -> String {
        if let Some(url) = &self.share_base_url {
            return url.clone();
        }
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        gio::File::for_path(root.join("index.html")).uri().to_string()
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_DIR).map(|dirs| dirs.config_dir().join(APP_CONFIG_FILE))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseArgs {
    pub root: Option<PathBuf>,
    pub link: Option<String>,
    pub share_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Browse(BrowseArgs),
    Generate {
        root: Option<PathBuf>,
        output: Option<PathBuf>,
    },
    Help,
}

impl Command {
    /// Parses the arguments after the program name.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::<String>::into).peekable();
        if args.peek().map(String::as_str) == Some("generate") {
            args.next();
            return Self::parse_generate(args);
        }

        let mut browse = BrowseArgs::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Self::Help),
                "--link" => browse.link = Some(required_value(&arg, args.next())?),
                "--share-url" => browse.share_url = Some(required_value(&arg, args.next())?),
                flag if flag.starts_with('-') => {
                    return Err(ConfigError::UnknownArgument(arg));
                }
                _ if browse.root.is_none() => browse.root = Some(PathBuf::from(arg)),
                _ => return Err(ConfigError::UnexpectedArgument(arg)),
            }
        }
        Ok(Self::Browse(browse))
    }

    fn parse_generate(mut args: impl Iterator<Item = String>) -> Result<Self, ConfigError> {
        let mut root = None;
        let mut output = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Self::Help),
                "-o" | "--output" => {
                    output = Some(PathBuf::from(required_value(&arg, args.next())?));
                }
                flag if flag.starts_with('-') => {
                    return Err(ConfigError::UnknownArgument(arg));
                }
                _ if root.is_none() => root = Some(PathBuf::from(arg)),
                _ => return Err(ConfigError::UnexpectedArgument(arg)),
            }
        }
        Ok(Self::Generate { root, output })
    }
}

fn required_value(flag: &str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}
