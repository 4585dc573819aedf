// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use homebook::commands::bills::{
    BillFilter, BillPatch, BillStatus, NewBill, bills_due_for_reminder, create_bill, delete_bill,
    generate_bills_for_month, get_bill, list_bills, pay_bill, pay_bill_at, update_bill,
};
use homebook::commands::categories::list_categories;
use homebook::commands::templates::{
    NewTemplate, TemplatePatch, create_template, delete_template, list_templates, update_template,
};
use homebook::commands::transactions::{
    TransactionFilter, TransactionPatch, delete_in_period, delete_transaction, get_transaction,
    list_transactions, update_transaction,
};
use homebook::commands::users;
use homebook::db;
use homebook::models::{Recurrence, TxType};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tempfile::tempdir;

fn setup() -> (Connection, i64) {
    let mut conn = db::open_in_memory().unwrap();
    let owner = users::register(&mut conn, "alice").unwrap().id;
    (conn, owner)
}

fn category(conn: &Connection, owner: i64, name: &str) -> i64 {
    list_categories(conn, owner)
        .unwrap()
        .into_iter()
        .find(|c| c.name == name)
        .unwrap()
        .id
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn new_bill(desc: &str, amount: i64, due: &str) -> NewBill {
    NewBill {
        description: desc.into(),
        amount: Decimal::from(amount),
        due_date: date(due),
        category_id: None,
        recurrence: None,
        reminder_days: None,
    }
}

fn new_template(desc: &str, amount: i64, due_day: u32) -> NewTemplate {
    NewTemplate {
        description: desc.into(),
        amount: Decimal::from(amount),
        category_id: None,
        due_day,
        recurrence: None,
        reminder_days: None,
        active: true,
    }
}

#[test]
fn create_bill_applies_defaults() {
    let (conn, owner) = setup();
    let b = create_bill(&conn, owner, &new_bill("Power", 80, "2024-03-15")).unwrap();
    assert!(!b.paid);
    assert_eq!(b.recurrence, Recurrence::None);
    assert_eq!(b.reminder_days, 1);
    assert_eq!(b.paid_at, None);
    assert_eq!(get_bill(&conn, owner, b.id).unwrap(), b);
}

#[test]
fn create_bill_validates_input() {
    let (conn, owner) = setup();
    let mut bad = new_bill("  ", 80, "2024-03-15");
    assert!(create_bill(&conn, owner, &bad).unwrap_err().is_validation());
    bad = new_bill("Power", 0, "2024-03-15");
    assert!(create_bill(&conn, owner, &bad).unwrap_err().is_validation());
    bad = new_bill("Power", 10, "2024-03-15");
    bad.reminder_days = Some(31);
    assert!(create_bill(&conn, owner, &bad).unwrap_err().is_validation());
    bad.reminder_days = Some(30);
    bad.category_id = Some(9999);
    assert!(create_bill(&conn, owner, &bad).unwrap_err().is_not_found());
}

#[test]
fn pay_bill_records_one_expense() {
    let (mut conn, owner) = setup();
    let rent = category(&conn, owner, "Rent");
    let mut nb = new_bill("March rent", 1500, "2024-03-01");
    nb.category_id = Some(rent);
    let b = create_bill(&conn, owner, &nb).unwrap();

    let paid = pay_bill_at(&mut conn, owner, b.id, at("2024-03-02 08:15:00")).unwrap();
    assert!(paid.paid);
    assert_eq!(paid.paid_at, Some(at("2024-03-02 08:15:00")));

    let txs = list_transactions(&conn, owner, &TransactionFilter::default()).unwrap();
    assert_eq!(txs.len(), 1);
    let t = &txs[0];
    assert_eq!(Some(t.id), paid.paid_transaction_id);
    assert_eq!(t.amount, Decimal::from(1500));
    assert_eq!(t.r#type, TxType::Expense);
    assert_eq!(t.description.as_deref(), Some("March rent"));
    assert_eq!(t.category_id, Some(rent));
    assert_eq!(t.occurred_on, date("2024-03-02"));
}

#[test]
fn paying_twice_is_a_no_op() {
    let (mut conn, owner) = setup();
    let b = create_bill(&conn, owner, &new_bill("Gym", 30, "2024-03-10")).unwrap();

    let first = pay_bill_at(&mut conn, owner, b.id, at("2024-03-09 10:00:00")).unwrap();
    let second = pay_bill_at(&mut conn, owner, b.id, at("2024-03-11 18:00:00")).unwrap();
    assert_eq!(first, second);
    assert_eq!(get_bill(&conn, owner, b.id).unwrap(), first);
    let txs = list_transactions(&conn, owner, &TransactionFilter::default()).unwrap();
    assert_eq!(txs.len(), 1);
}

#[test]
fn cannot_pay_someone_elses_bill() {
    let (mut conn, alice) = setup();
    let bob = users::register(&mut conn, "bob").unwrap().id;
    let b = create_bill(&conn, alice, &new_bill("Internet", 45, "2024-03-20")).unwrap();

    let err = pay_bill_at(&mut conn, bob, b.id, at("2024-03-20 12:00:00")).unwrap_err();
    assert!(err.is_not_found());
    let err = pay_bill_at(&mut conn, alice, 4242, at("2024-03-20 12:00:00")).unwrap_err();
    assert!(err.is_not_found());

    assert!(!get_bill(&conn, alice, b.id).unwrap().paid);
    assert!(
        list_transactions(&conn, bob, &TransactionFilter::default())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn paid_bill_keeps_its_payment() {
    let (mut conn, owner) = setup();
    let b = create_bill(&conn, owner, &new_bill("Water", 40, "2024-03-20")).unwrap();
    let paid = pay_bill_at(&mut conn, owner, b.id, at("2024-03-19 07:00:00")).unwrap();
    let tx_id = paid.paid_transaction_id.unwrap();

    let amount_change = BillPatch {
        amount: Some(Decimal::from(50)),
        ..Default::default()
    };
    assert!(update_bill(&conn, owner, b.id, &amount_change).unwrap_err().is_conflict());
    let due_change = BillPatch {
        due_date: Some(date("2024-03-21")),
        ..Default::default()
    };
    assert_eq!(
        update_bill(&conn, owner, b.id, &due_change).unwrap().due_date,
        date("2024-03-21")
    );

    assert!(delete_transaction(&conn, owner, tx_id).unwrap_err().is_conflict());
    let removed = delete_in_period(&conn, owner, date("2024-03-01"), date("2024-03-31")).unwrap();
    assert_eq!(removed, 0);

    delete_bill(&conn, owner, b.id).unwrap();
    assert!(get_bill(&conn, owner, b.id).unwrap_err().is_not_found());
    assert_eq!(
        list_transactions(&conn, owner, &TransactionFilter::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn payment_transaction_is_frozen_except_its_date() {
    let (mut conn, owner) = setup();
    let b = create_bill(&conn, owner, &new_bill("Power", 100, "2024-03-20")).unwrap();
    let paid = pay_bill_at(&mut conn, owner, b.id, at("2024-03-19 07:00:00")).unwrap();
    let tx_id = paid.paid_transaction_id.unwrap();

    let rewrite = TransactionPatch {
        amount: Some(Decimal::ONE),
        r#type: Some(TxType::Income),
        description: Some(Some("x".into())),
        ..Default::default()
    };
    assert!(update_transaction(&conn, owner, tx_id, &rewrite).unwrap_err().is_conflict());
    let recategorise = TransactionPatch {
        category_id: Some(None),
        ..Default::default()
    };
    assert!(
        update_transaction(&conn, owner, tx_id, &recategorise)
            .unwrap_err()
            .is_conflict()
    );

    let t = get_transaction(&conn, owner, tx_id).unwrap();
    assert_eq!(t.amount, Decimal::from(100));
    assert_eq!(t.r#type, TxType::Expense);
    assert_eq!(t.description.as_deref(), Some("Power"));

    let redate = TransactionPatch {
        occurred_on: Some(date("2024-03-18")),
        ..Default::default()
    };
    let moved = update_transaction(&conn, owner, tx_id, &redate).unwrap();
    assert_eq!(moved.occurred_on, date("2024-03-18"));
    assert_eq!(moved.amount, Decimal::from(100));
}

#[test]
fn concurrent_payments_record_one_transaction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("homebook.sqlite");
    let mut conn = db::open_or_init(&path).unwrap();
    let owner = users::register(&mut conn, "alice").unwrap().id;
    let b = create_bill(&conn, owner, &new_bill("Rent", 1200, "2024-03-01")).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let mut c = db::open_or_init(&path).unwrap();
            std::thread::spawn(move || pay_bill(&mut c, owner, b.id).map(|p| p.paid_transaction_id))
        })
        .collect();
    let results: Vec<Option<i64>> = workers
        .into_iter()
        .map(|w| w.join().unwrap().unwrap())
        .collect();

    assert!(results[0].is_some());
    assert!(results.iter().all(|r| *r == results[0]));
    let txs = list_transactions(&conn, owner, &TransactionFilter::default()).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(Some(txs[0].id), results[0]);
    assert!(get_bill(&conn, owner, b.id).unwrap().paid);
}

#[test]
fn list_bills_filters_and_orders_by_due_date() {
    let (mut conn, owner) = setup();
    let late = create_bill(&conn, owner, &new_bill("Late", 10, "2024-03-25")).unwrap();
    let early = create_bill(&conn, owner, &new_bill("Early", 10, "2024-03-05")).unwrap();
    let april = create_bill(&conn, owner, &new_bill("April", 10, "2024-04-02")).unwrap();
    pay_bill_at(&mut conn, owner, early.id, at("2024-03-04 09:00:00")).unwrap();

    let all = list_bills(&conn, owner, &BillFilter::default()).unwrap();
    let ids: Vec<i64> = all.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![early.id, late.id, april.id]);

    let unpaid = list_bills(
        &conn,
        owner,
        &BillFilter {
            status: Some(BillStatus::Unpaid),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(unpaid.iter().map(|b| b.id).collect::<Vec<_>>(), vec![late.id, april.id]);

    let march = list_bills(
        &conn,
        owner,
        &BillFilter {
            status: None,
            from: Some(date("2024-03-01")),
            to: Some(date("2024-03-31")),
        },
    )
    .unwrap();
    assert_eq!(march.len(), 2);
}

#[test]
fn reminder_window_opens_before_due_date() {
    let (conn, owner) = setup();
    let mut nb = new_bill("Insurance", 120, "2024-03-10");
    nb.reminder_days = Some(3);
    let b = create_bill(&conn, owner, &nb).unwrap();

    assert!(bills_due_for_reminder(&conn, owner, date("2024-03-06")).unwrap().is_empty());
    let due = bills_due_for_reminder(&conn, owner, date("2024-03-07")).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, b.id);
    assert_eq!(bills_due_for_reminder(&conn, owner, date("2024-03-10")).unwrap().len(), 1);
    assert!(bills_due_for_reminder(&conn, owner, date("2024-03-11")).unwrap().is_empty());
}

#[test]
fn generation_clamps_due_day_to_month_end() {
    let (mut conn, owner) = setup();
    let rent = category(&conn, owner, "Rent");
    let mut t = new_template("Rent", 1200, 31);
    t.category_id = Some(rent);
    let template = create_template(&conn, owner, &t).unwrap();
    assert_eq!(template.recurrence, Recurrence::Monthly);

    let feb = generate_bills_for_month(&mut conn, owner, "2024-02").unwrap();
    assert_eq!(feb.len(), 1);
    assert_eq!(feb[0].due_date, date("2024-02-29"));
    assert_eq!(feb[0].amount, Decimal::from(1200));
    assert_eq!(feb[0].category_id, Some(rent));
    assert_eq!(feb[0].bill_template_id, Some(template.id));
    assert!(!feb[0].paid);

    let feb_2023 = generate_bills_for_month(&mut conn, owner, "2023-02").unwrap();
    assert_eq!(feb_2023[0].due_date, date("2023-02-28"));
    let april = generate_bills_for_month(&mut conn, owner, "2024-04").unwrap();
    assert_eq!(april[0].due_date, date("2024-04-30"));
}

#[test]
fn generation_is_idempotent_per_month() {
    let (mut conn, owner) = setup();
    create_template(&conn, owner, &new_template("Internet", 45, 15)).unwrap();
    create_template(&conn, owner, &new_template("Gym", 30, 1)).unwrap();
    let mut paused = new_template("Paused", 99, 20);
    paused.active = false;
    create_template(&conn, owner, &paused).unwrap();

    let first = generate_bills_for_month(&mut conn, owner, "2024-03").unwrap();
    assert_eq!(first.len(), 2);
    let second = generate_bills_for_month(&mut conn, owner, "2024-03").unwrap();
    assert!(second.is_empty());

    let march = list_bills(
        &conn,
        owner,
        &BillFilter {
            from: Some(date("2024-03-01")),
            to: Some(date("2024-03-31")),
            ..Default::default()
        },
    )
    .unwrap();
    let names: Vec<&str> = march.iter().map(|b| b.description.as_str()).collect();
    assert_eq!(names, vec!["Gym", "Internet"]);
}

#[test]
fn generation_rejects_bad_month() {
    let (mut conn, owner) = setup();
    create_template(&conn, owner, &new_template("Internet", 45, 15)).unwrap();
    for bad in ["2024-13", "2024-00", "soon"] {
        let err = generate_bills_for_month(&mut conn, owner, bad).unwrap_err();
        assert!(err.is_validation());
    }
    assert!(list_bills(&conn, owner, &BillFilter::default()).unwrap().is_empty());
}

#[test]
fn template_edits_apply_to_later_months_only() {
    let (mut conn, owner) = setup();
    let t = create_template(&conn, owner, &new_template("Internet", 45, 15)).unwrap();
    generate_bills_for_month(&mut conn, owner, "2024-03").unwrap();

    let patch = TemplatePatch {
        amount: Some(Decimal::from(50)),
        ..Default::default()
    };
    assert_eq!(update_template(&conn, owner, t.id, &patch).unwrap().amount, Decimal::from(50));
    let april = generate_bills_for_month(&mut conn, owner, "2024-04").unwrap();
    assert_eq!(april[0].amount, Decimal::from(50));
    let all = list_bills(&conn, owner, &BillFilter::default()).unwrap();
    assert_eq!(all[0].amount, Decimal::from(45));

    let pause = TemplatePatch {
        active: Some(false),
        ..Default::default()
    };
    update_template(&conn, owner, t.id, &pause).unwrap();
    assert!(generate_bills_for_month(&mut conn, owner, "2024-05").unwrap().is_empty());
}

#[test]
fn template_validation_and_delete() {
    let (conn, owner) = setup();
    assert!(
        create_template(&conn, owner, &new_template("Bad", 10, 0))
            .unwrap_err()
            .is_validation()
    );
    assert!(
        create_template(&conn, owner, &new_template("Bad", 10, 32))
            .unwrap_err()
            .is_validation()
    );
    let t = create_template(&conn, owner, &new_template("Gym", 30, 1)).unwrap();
    assert_eq!(list_templates(&conn, owner).unwrap().len(), 1);
    delete_template(&conn, owner, t.id).unwrap();
    assert!(delete_template(&conn, owner, t.id).unwrap_err().is_not_found());
    assert!(list_templates(&conn, owner).unwrap().is_empty());
}

#[test]
fn deleting_a_template_keeps_its_bills() {
    let (mut conn, owner) = setup();
    let t = create_template(&conn, owner, &new_template("Gym", 30, 1)).unwrap();
    let created = generate_bills_for_month(&mut conn, owner, "2024-03").unwrap();
    delete_template(&conn, owner, t.id).unwrap();

    let b = get_bill(&conn, owner, created[0].id).unwrap();
    assert_eq!(b.bill_template_id, None);
    assert_eq!(b.description, "Gym");
}
