// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use homebook::config::{AppConfig, init_logging};
use homebook::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let cfg = AppConfig::from_matches(&matches)?;
    init_logging(&cfg.log_filter);
    tracing::debug!(db = %cfg.db_path.display(), owner = ?cfg.owner, "starting");

    let mut conn = db::open_or_init(&cfg.db_path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", cfg.db_path.display());
        }
        Some(("user", sub)) => commands::users::handle(&mut conn, sub)?,
        Some(("category", sub)) => commands::categories::handle(&conn, &cfg, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&conn, &cfg, sub)?,
        Some(("bill", sub)) => commands::bills::handle(&mut conn, &cfg, sub)?,
        Some(("template", sub)) => commands::templates::handle(&conn, &cfg, sub)?,
        Some(("overview", sub)) => commands::overview::handle(&conn, &cfg, sub)?,
        Some(("advice", sub)) => commands::advice::handle(&conn, &cfg, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, &cfg, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
