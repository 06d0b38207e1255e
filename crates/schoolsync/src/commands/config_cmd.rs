//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format the effective config as TOML-like text, with the resolved
/// cache directory spelled out.
fn format_config(cfg: &Config, global: &GlobalOpts) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out);
    let _ = writeln!(out, "[sync]");
    let _ = writeln!(out, "default_total_fee = {}", cfg.sync.default_total_fee);
    let _ = writeln!(out, "cache_enabled = {}", cfg.sync.cache_enabled);
    let _ = writeln!(out, "cache_key_prefix = \"{}\"", cfg.sync.cache_key_prefix);
    let _ = writeln!(
        out,
        "fee_ready_warn_after_secs = {}",
        cfg.sync.fee_ready_warn_after_secs
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "[cache]");
    let _ = write!(
        out,
        "dir = \"{}\"",
        config::resolve_cache_dir(global, cfg).display()
    );

    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| format_config(c, global),
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::Conflict {
                    resource_type: "config file".into(),
                    identifier: path.display().to_string(),
                });
            }

            config::save_config(&Config::default())?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
            }
            Ok(())
        }
    }
}
