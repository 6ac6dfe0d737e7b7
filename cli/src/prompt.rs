use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use lpardiff_core::session::Credentials;

/// Prompts for the HMC credential pair. The same user/password is assumed
/// to be valid on every configured HMC.
pub fn credentials() -> anyhow::Result<Credentials> {
    let mut stdout = io::stdout();
    write!(stdout, "HMC username: ").context("writing prompt")?;
    stdout.flush().context("writing prompt")?;

    let mut user = String::new();
    io::stdin()
        .lock()
        .read_line(&mut user)
        .context("reading username")?;
    let user = user.trim().to_string();
    if user.is_empty() {
        bail!("an HMC username is required");
    }

    let password = rpassword::prompt_password("HMC password: ").context("reading password")?;

    Ok(Credentials { user, password })
}
