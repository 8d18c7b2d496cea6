//! Inspect link parsing.

use std::sync::LazyLock;

use regex::Regex;

use super::{InspectKey, OwnerContext};
use crate::error::{Error, Result};

const LINK_PREFIX: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20";

// Owner marker, owner token, asset id, signature. Anchored at the end so the
// preamble (raw space, `%20` or none) is irrelevant.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([SM])(\d+)A(\d+)D(\d+)$").expect("static inspect link pattern")
});

/// Parse an inspect link into its canonical key.
pub fn parse_link(link: &str) -> Result<InspectKey> {
    let invalid = || Error::InvalidLink(link.to_string());

    let caps = LINK_RE.captures(link.trim()).ok_or_else(invalid)?;
    let token: u64 = caps[2].parse().map_err(|_| invalid())?;
    let asset_id: u64 = caps[3].parse().map_err(|_| invalid())?;
    let signature: u64 = caps[4].parse().map_err(|_| invalid())?;

    let owner = match &caps[1] {
        "S" => OwnerContext::from_tokens(token, 0),
        _ => OwnerContext::from_tokens(0, token),
    }
    .ok_or_else(invalid)?;

    if asset_id == 0 {
        return Err(invalid());
    }

    Ok(InspectKey::new(owner, asset_id, signature))
}

/// Render the canonical inspect link for a key.
pub fn to_link(key: &InspectKey) -> String {
    format!("{LINK_PREFIX}{key}")
}
