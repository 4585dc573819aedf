// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use homebook::commands::categories::{
    self, DEFAULT_CATEGORIES, create_category, get_category, list_categories,
};
use homebook::commands::users::{list_users, register};
use homebook::config::AppConfig;
use homebook::error::FinanceError;
use homebook::models::CategoryKind;
use homebook::{cli, db};

#[test]
fn register_seeds_default_categories() {
    let mut conn = db::open_in_memory().unwrap();
    let user = register(&mut conn, "  alice ").unwrap();
    assert_eq!(user.name, "alice");

    let cats = list_categories(&conn, user.id).unwrap();
    assert_eq!(cats.len(), DEFAULT_CATEGORIES.len());
    let rent = cats.iter().find(|c| c.name == "Rent").unwrap();
    assert_eq!(rent.kind, CategoryKind::FixedExpense);
    assert!(cats.iter().all(|c| c.owner_id == user.id));
}

#[test]
fn duplicate_or_blank_user_names_fail() {
    let mut conn = db::open_in_memory().unwrap();
    register(&mut conn, "alice").unwrap();
    assert!(register(&mut conn, "alice").unwrap_err().is_conflict());
    assert!(register(&mut conn, "   ").unwrap_err().is_validation());
    assert_eq!(list_users(&conn).unwrap().len(), 1);
}

#[test]
fn category_names_are_unique_per_owner() {
    let mut conn = db::open_in_memory().unwrap();
    let alice = register(&mut conn, "alice").unwrap().id;
    let bob = register(&mut conn, "bob").unwrap().id;

    let pets = create_category(&conn, alice, "Pets", CategoryKind::VariableExpense).unwrap();
    assert_eq!(get_category(&conn, alice, pets.id).unwrap().name, "Pets");
    let err = create_category(&conn, alice, "Pets", CategoryKind::FixedExpense).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status(), 409);

    create_category(&conn, bob, "Pets", CategoryKind::VariableExpense).unwrap();
    assert!(get_category(&conn, bob, pets.id).unwrap_err().is_not_found());
    assert!(
        create_category(&conn, alice, " ", CategoryKind::Income)
            .unwrap_err()
            .is_validation()
    );
}

#[test]
fn category_kind_parsing() {
    assert_eq!("fixed".parse::<CategoryKind>().unwrap(), CategoryKind::FixedExpense);
    assert_eq!(
        "VariableExpense".parse::<CategoryKind>().unwrap(),
        CategoryKind::VariableExpense
    );
    assert!("savings".parse::<CategoryKind>().unwrap_err().is_validation());
}

#[test]
fn category_add_via_cli() {
    let mut conn = db::open_in_memory().unwrap();
    let alice = register(&mut conn, "alice").unwrap().id;
    let cfg = AppConfig::for_owner(alice);
    let matches = cli::build_cli().get_matches_from([
        "homebook", "category", "add", "--name", "Streaming", "--kind", "fixed",
    ]);
    let Some(("category", cat_m)) = matches.subcommand() else {
        panic!("no category subcommand");
    };
    categories::handle(&conn, &cfg, cat_m).unwrap();

    let found = list_categories(&conn, alice)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Streaming")
        .unwrap();
    assert_eq!(found.kind, CategoryKind::FixedExpense);
}

#[test]
fn commands_need_a_known_user() {
    let conn = db::open_in_memory().unwrap();
    let mut cfg = AppConfig::for_owner(7);
    let err = cfg.require_owner(&conn).unwrap_err();
    assert!(err.downcast_ref::<FinanceError>().unwrap().is_not_found());

    cfg.owner = None;
    let err = cfg.require_owner(&conn).unwrap_err();
    assert!(err.downcast_ref::<FinanceError>().unwrap().is_validation());
}
