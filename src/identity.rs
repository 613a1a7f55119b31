//! Identity resolution for jobdesk commands.
//!
//! Every command acts as some principal. Identity is resolved through a chain:
//!
//! 1. `--as <identity>`: explicit per-command override
//! 2. `JOBDESK_IDENTITY` env var: process/session level
//! 3. `default-identity` in `~/.jobdesk/config.toml`
//!
//! The resolved name is looked up in the config's `[principals]` tables to
//! get its grants, and is recorded as the author of every version snapshot.

use std::env;

use crate::config::Config;

/// Environment variable consulted when `--as` is absent.
pub const IDENTITY_ENV: &str = "JOBDESK_IDENTITY";

/// Error message shown when identity cannot be resolved.
pub const IDENTITY_REQUIRED: &str = "identity required: pass --as <identity>, \
    set JOBDESK_IDENTITY, or add `default-identity = \"...\"` to ~/.jobdesk/config.toml";

/// Resolve the acting identity from the tiered resolution chain.
pub fn resolve_identity(explicit: Option<&str>, config: &Config) -> Result<String, String> {
    let from_env = env::var(IDENTITY_ENV).ok();
    resolve_from(explicit, from_env.as_deref(), config.default_identity.as_deref())
}

/// The resolution chain over already-read sources. Empty values are skipped.
fn resolve_from(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
) -> Result<String, String> {
    [explicit, from_env, from_config]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IDENTITY_REQUIRED.to_string())
}
