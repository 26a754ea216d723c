//! Interactive confirmation prompts

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Ask before replacing an existing report. Non-interactive runs skip the prompt.
pub fn confirm_overwrite(path: &Path, no_confirm: bool) -> Result<bool> {
    if no_confirm || !path.exists() {
        return Ok(true);
    }
    let confirmed = Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()?;
    Ok(confirmed)
}
