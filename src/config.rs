//! jobdesk configuration.
//!
//! Loaded from `~/.jobdesk/config.toml`. Every key is optional; a missing
//! file means defaults throughout.
//!
//! ```toml
//! database = "/srv/jobdesk/jobs.sqlite"
//! time-zone = "Europe/Berlin"
//! default-identity = "editor"
//!
//! [principals.root]
//! administrator = true
//!
//! [principals.editor]
//! archives = [1, 5]
//! fields = ["job::published"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::model::{ArchiveId, Principal};
use crate::storage::Storage;

/// jobdesk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Database file. Defaults to `~/.jobdesk/jobs.sqlite`.
    pub database: Option<PathBuf>,

    /// IANA time zone used for schedule arithmetic. Defaults to the
    /// system zone.
    pub time_zone: Option<String>,

    /// Identity used when neither `--as` nor `JOBDESK_IDENTITY` is set.
    pub default_identity: Option<String>,

    /// Grants per identity.
    #[serde(default)]
    pub principals: BTreeMap<String, PrincipalConfig>,
}

/// Grants for one identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PrincipalConfig {
    #[serde(default)]
    pub administrator: bool,

    #[serde(default)]
    pub archives: Vec<i64>,

    /// Field grants in `<entity-kind>::<field>` form.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Config {
    /// Load config from `~/.jobdesk/config.toml`, or defaults if it does
    /// not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::path().ok_or("could not determine home directory")?;
        Self::load_from(&path)
    }

    /// Load config from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;

        if config.default_identity.as_deref() == Some("") {
            return Err("default-identity is empty".to_string());
        }

        Ok(config)
    }

    /// The config file path: `~/.jobdesk/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".jobdesk").join("config.toml"))
    }

    pub fn database_path(&self) -> Result<PathBuf, String> {
        self.database
            .clone()
            .or_else(Storage::default_path)
            .ok_or_else(|| "could not determine home directory".to_string())
    }

    pub fn calendar(&self) -> Result<Calendar, String> {
        match &self.time_zone {
            Some(name) => TimeZone::get(name)
                .map(Calendar::new)
                .map_err(|e| format!("invalid time-zone \"{name}\": {e}")),
            None => Ok(Calendar::system()),
        }
    }

    /// The principal for `name`.
    ///
    /// Identities without a `[principals.<name>]` table get no grants.
    pub fn principal(&self, name: &str) -> Principal {
        match self.principals.get(name) {
            Some(grants) if grants.administrator => Principal::administrator(name),
            Some(grants) => Principal::scoped(
                name,
                grants.archives.iter().copied().map(ArchiveId),
                grants.fields.iter().cloned(),
            ),
            None => Principal::scoped(name, [], Vec::<String>::new()),
        }
    }
}
