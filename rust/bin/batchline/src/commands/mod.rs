pub mod batch;
pub mod context;
pub mod record;
pub mod schema;

use std::path::Path;

use anyhow::Result;

use batchline_client::{HttpApi, Session};
use batchline_core::Role;

use crate::config::ClientConfig;

/// Build a session for the current context.
pub(crate) fn open_session(config_path: &Path) -> Result<Session<HttpApi>> {
    let config = ClientConfig::load(config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `batchline context create <name> --server <url>`."))?;
    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `batchline context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let api = HttpApi::new(&ctx.server, &ctx.token)?;
    let role = Role::parse(&ctx.role);
    let mut session = Session::new(api, role);
    session.load_field_config();
    Ok(session)
}

/// `[y/N]` prompt, skipped when `-y` was passed.
pub(crate) fn confirm(prompt: &str, yes: bool) -> bool {
    if yes {
        return true;
    }
    eprint!("{prompt} [y/N]: ");
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

/// Read one line from stdin after a prompt.
pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
