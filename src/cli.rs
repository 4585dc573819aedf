// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON document per line"),
    )
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .required(true)
        .value_parser(value_parser!(i64))
}

fn category_arg() -> Arg {
    Arg::new("category")
        .long("category")
        .value_parser(value_parser!(i64))
        .help("Category id")
}

fn clear_category_arg() -> Arg {
    Arg::new("clear_category")
        .long("clear-category")
        .action(ArgAction::SetTrue)
        .conflicts_with("category")
}

fn range_args(cmd: Command, required: bool) -> Command {
    cmd.arg(
        Arg::new("from")
            .long("from")
            .required(required)
            .help("First date, YYYY-MM-DD (inclusive)"),
    )
    .arg(
        Arg::new("to")
            .long("to")
            .required(required)
            .help("Last date, YYYY-MM-DD (inclusive)"),
    )
}

fn recurrence_arg() -> Arg {
    Arg::new("recurrence")
        .long("recurrence")
        .help("None | Monthly | Weekly")
}

fn remind_days_arg() -> Arg {
    Arg::new("remind_days")
        .long("remind-days")
        .value_parser(value_parser!(u32))
        .help("Days before the due date to start reminding (0-30)")
}

pub fn build_cli() -> Command {
    Command::new("homebook")
        .about("Household ledger: transactions, bills, monthly overview and advice")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("HOMEBOOK_DB")
                .help("SQLite database path"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .env("HOMEBOOK_USER")
                .value_parser(value_parser!(i64))
                .help("Owner id every command acts for"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .env("HOMEBOOK_LOG")
                .help("Log filter, e.g. info or homebook=debug"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("user")
                .about("Users")
                .subcommand(
                    Command::new("add")
                        .about("Register a user and seed default categories")
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("category")
                .about("Categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("FixedExpense | VariableExpense | Income"),
                        ),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .help("Income | Expense"),
                        )
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(category_arg()),
                )
                .subcommand(json_flags(range_args(
                    Command::new("list")
                        .arg(Arg::new("type").long("type"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                    false,
                )))
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg())
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("type").long("type"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(category_arg())
                        .arg(clear_category_arg()),
                )
                .subcommand(Command::new("rm").arg(id_arg()))
                .subcommand(range_args(
                    Command::new("purge").about("Delete all transactions in a date range"),
                    true,
                ))
                .subcommand(json_flags(range_args(Command::new("summary"), false)))
                .subcommand(json_flags(range_args(Command::new("by-category"), false))),
        )
        .subcommand(
            Command::new("bill")
                .about("Bills")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("desc").long("desc").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("due")
                                .long("due")
                                .required(true)
                                .help("Due date, YYYY-MM-DD"),
                        )
                        .arg(category_arg())
                        .arg(recurrence_arg())
                        .arg(remind_days_arg()),
                )
                .subcommand(json_flags(range_args(
                    Command::new("list")
                        .arg(Arg::new("status").long("status").help("paid | unpaid"))
                        .arg(
                            Arg::new("remind")
                                .long("remind")
                                .action(ArgAction::SetTrue)
                                .help("Only unpaid bills inside their reminder window"),
                        ),
                    false,
                )))
                .subcommand(json_flags(Command::new("show").arg(id_arg())))
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg())
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("due").long("due"))
                        .arg(category_arg())
                        .arg(clear_category_arg())
                        .arg(recurrence_arg())
                        .arg(remind_days_arg()),
                )
                .subcommand(Command::new("rm").arg(id_arg()))
                .subcommand(
                    Command::new("pay")
                        .about("Pay a bill, recording the expense")
                        .arg(id_arg())
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
                )
                .subcommand(json_flags(
                    Command::new("generate")
                        .about("Create this month's bills from active templates")
                        .arg(Arg::new("month").long("month").required(true)),
                )),
        )
        .subcommand(
            Command::new("template")
                .about("Recurring bill templates")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("desc").long("desc").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("due_day")
                                .long("due-day")
                                .required(true)
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(category_arg())
                        .arg(recurrence_arg())
                        .arg(remind_days_arg())
                        .arg(
                            Arg::new("inactive")
                                .long("inactive")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg())
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(
                            Arg::new("due_day")
                                .long("due-day")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(category_arg())
                        .arg(clear_category_arg())
                        .arg(recurrence_arg())
                        .arg(remind_days_arg())
                        .arg(
                            Arg::new("activate")
                                .long("activate")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("deactivate")
                                .long("deactivate")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("activate"),
                        ),
                )
                .subcommand(Command::new("rm").arg(id_arg())),
        )
        .subcommand(json_flags(
            Command::new("overview")
                .about("Monthly totals, ratios and bills")
                .arg(
                    Arg::new("month")
                        .long("month")
                        .required(true)
                        .help("YYYY-MM"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("advice")
                .about("Budgeting advice for a month")
                .arg(
                    Arg::new("month")
                        .long("month")
                        .help("YYYY-MM, defaults to the current month"),
                ),
        ))
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(range_args(
                    Command::new("transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv | json"),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                    false,
                )),
        )
}
