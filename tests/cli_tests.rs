// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use homebook::commands::users::{list_users, register};
use homebook::config::AppConfig;
use homebook::{cli, db};
use tempfile::tempdir;

#[test]
fn global_flags_resolve_into_config() {
    let matches = cli::build_cli().get_matches_from([
        "homebook",
        "--db",
        "/tmp/hb-test.sqlite",
        "overview",
        "--month",
        "2024-03",
        "--user",
        "3",
        "--log",
        "debug",
    ]);
    let cfg = AppConfig::from_matches(&matches).unwrap();
    assert_eq!(cfg.db_path.to_string_lossy(), "/tmp/hb-test.sqlite");
    assert_eq!(cfg.owner, Some(3));
    assert_eq!(cfg.log_filter, "debug");

    let Some(("overview", ov)) = matches.subcommand() else {
        panic!("no overview subcommand");
    };
    assert_eq!(ov.get_one::<String>("month").unwrap(), "2024-03");
}

#[test]
fn overview_requires_a_month() {
    let res = cli::build_cli().try_get_matches_from(["homebook", "overview"]);
    assert!(res.is_err());
}

#[test]
fn user_id_must_be_numeric() {
    let res = cli::build_cli().try_get_matches_from(["homebook", "--user", "alice", "advice"]);
    assert!(res.is_err());
}

#[test]
fn json_and_jsonl_conflict() {
    let res = cli::build_cli().try_get_matches_from([
        "homebook", "bill", "list", "--json", "--jsonl",
    ]);
    assert!(res.is_err());
}

#[test]
fn template_edit_rejects_activate_and_deactivate() {
    let res = cli::build_cli().try_get_matches_from([
        "homebook",
        "template",
        "edit",
        "--id",
        "1",
        "--activate",
        "--deactivate",
    ]);
    assert!(res.is_err());
}

#[test]
fn database_file_persists_between_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("homebook.sqlite");
    {
        let mut conn = db::open_or_init(&path).unwrap();
        register(&mut conn, "alice").unwrap();
    }
    assert!(path.exists());
    let conn = db::open_or_init(&path).unwrap();
    let users = list_users(&conn).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "alice");
}
