//! Deterministic TPC-H subset (`nation`, `orders`, `lineitem`).
//!
//! Values follow the shape of the dbgen tables closely enough for date
//! arithmetic: order dates span 1992-01-01..=1998-08-02 and line item dates
//! are derived from their order. The same seed always yields the same files.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::e2e::config::GeneratorConfig;
use crate::e2e::schema::{table_file, table_schema};
use crate::storage::{csv, parquet, FileFormat};
use crate::types::error::{Error, Result};
use crate::types::{Row, Value};

const NATIONS: [(&str, i64); 25] = [
    ("ALGERIA", 0),
    ("ARGENTINA", 1),
    ("BRAZIL", 1),
    ("CANADA", 1),
    ("EGYPT", 4),
    ("ETHIOPIA", 0),
    ("FRANCE", 3),
    ("GERMANY", 3),
    ("INDIA", 2),
    ("INDONESIA", 2),
    ("IRAN", 4),
    ("IRAQ", 4),
    ("JAPAN", 2),
    ("JORDAN", 4),
    ("KENYA", 0),
    ("MOROCCO", 0),
    ("MOZAMBIQUE", 0),
    ("PERU", 1),
    ("CHINA", 2),
    ("ROMANIA", 3),
    ("SAUDI ARABIA", 4),
    ("VIETNAM", 2),
    ("RUSSIA", 3),
    ("UNITED KINGDOM", 3),
    ("UNITED STATES", 1),
];

const PRIORITIES: [&str; 5] = ["1-URGENT", "2-HIGH", "3-MEDIUM", "4-NOT SPECIFIED", "5-LOW"];
const INSTRUCTIONS: [&str; 4] = ["DELIVER IN PERSON", "COLLECT COD", "NONE", "TAKE BACK RETURN"];
const MODES: [&str; 7] = ["REG AIR", "AIR", "RAIL", "SHIP", "TRUCK", "MAIL", "FOB"];
const WORDS: [&str; 16] = [
    "furiously", "quickly", "carefully", "blithely", "slyly", "ironic", "final", "pending",
    "regular", "special", "express", "requests", "deposits", "accounts", "packages", "theodolites",
];

const ORDER_DATE_SPAN_DAYS: i64 = 2405;
const LINEITEM_FILES: usize = 2;

fn start_date() -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(1992, 1, 1)
        .ok_or_else(|| Error::Harness("Invalid generator start date".to_string()))
}

fn current_date() -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(1995, 6, 17)
        .ok_or_else(|| Error::Harness("Invalid generator current date".to_string()))
}

fn comment(rng: &mut StdRng) -> String {
    let count = rng.gen_range(2..=6);
    (0..count)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect::<Vec<&str>>()
        .join(" ")
}

fn money(cents: i64) -> Value {
    Value::Double(cents as f64 / 100.0)
}

pub struct Tables {
    pub nation: Vec<Row>,
    pub orders: Vec<Row>,
    pub lineitem: Vec<Row>,
}

pub fn build_tables(config: &GeneratorConfig) -> Result<Tables> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = start_date()?;
    let current = current_date()?;

    let nation = NATIONS
        .iter()
        .enumerate()
        .map(|(key, (name, region))| {
            vec![
                Value::Long(key as i64),
                Value::Str(name.to_string()),
                Value::Long(*region),
                Value::Str(comment(&mut rng)),
            ]
        })
        .collect::<Vec<Row>>();

    let mut orders = Vec::with_capacity(config.orders);
    let mut lineitem = Vec::with_capacity(config.orders * 4);

    for order_key in 1..=config.orders as i64 {
        let order_date = start + Duration::days(rng.gen_range(0..=ORDER_DATE_SPAN_DAYS));
        let lines = rng.gen_range(1..=7);
        let mut total_cents = 0i64;
        let mut shipped = 0;

        for line_number in 1..=lines {
            let part_key: i64 = rng.gen_range(1..=200);
            let quantity: i64 = rng.gen_range(1..=50);
            let discount: i64 = rng.gen_range(0..=10);
            let tax: i64 = rng.gen_range(0..=8);
            let price_cents = 90_000 + (part_key % 1000) * 100 + part_key / 10;
            let extended_cents = quantity * price_cents;
            total_cents += extended_cents * (100 - discount) * (100 + tax) / 10_000;

            let ship_date = order_date + Duration::days(rng.gen_range(1..=121));
            let commit_date = order_date + Duration::days(rng.gen_range(30..=90));
            let receipt_date = ship_date + Duration::days(rng.gen_range(1..=30));
            let line_status = if ship_date > current { "O" } else { "F" };
            if line_status == "F" {
                shipped += 1;
            }
            let return_flag = if receipt_date <= current {
                if rng.gen_bool(0.5) {
                    "R"
                } else {
                    "A"
                }
            } else {
                "N"
            };

            lineitem.push(vec![
                Value::Long(order_key),
                Value::Long(part_key),
                Value::Long(rng.gen_range(1..=10)),
                Value::Long(line_number),
                Value::Double(quantity as f64),
                money(extended_cents),
                money(discount),
                money(tax),
                Value::Str(return_flag.to_string()),
                Value::Str(line_status.to_string()),
                Value::Date(ship_date),
                Value::Date(commit_date),
                Value::Date(receipt_date),
                Value::Str(INSTRUCTIONS[rng.gen_range(0..INSTRUCTIONS.len())].to_string()),
                Value::Str(MODES[rng.gen_range(0..MODES.len())].to_string()),
                Value::Str(comment(&mut rng)),
            ]);
        }

        let status = match shipped {
            0 => "O",
            n if n == lines => "F",
            _ => "P",
        };
        orders.push(vec![
            Value::Long(order_key),
            Value::Long(rng.gen_range(1..=150)),
            Value::Str(status.to_string()),
            money(total_cents),
            Value::Date(order_date),
            Value::Str(PRIORITIES[rng.gen_range(0..PRIORITIES.len())].to_string()),
            Value::Str(format!("Clerk#{:09}", rng.gen_range(1..=1000))),
            Value::Long(0),
            Value::Str(comment(&mut rng)),
        ]);
    }

    Ok(Tables {
        nation,
        orders,
        lineitem,
    })
}

fn write_parts(data_dir: &Path, table: &str, rows: &[Row], parts: usize) -> Result<()> {
    let schema = table_schema(table)?;
    let per_part = ((rows.len() + parts - 1) / parts).max(1);

    for (part, rows) in rows.chunks(per_part).enumerate() {
        csv::write_table(&table_file(data_dir, table, FileFormat::Csv, part), rows)?;
        parquet::write_table(
            &table_file(data_dir, table, FileFormat::Parquet, part),
            &schema,
            rows,
        )?;
    }
    Ok(())
}

/// Writes every table in both formats under `data_dir`.
pub fn generate(data_dir: &Path, config: &GeneratorConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let tables = build_tables(config)?;

    write_parts(data_dir, "nation", &tables.nation, 1)?;
    write_parts(data_dir, "orders", &tables.orders, 1)?;
    write_parts(data_dir, "lineitem", &tables.lineitem, LINEITEM_FILES)?;

    tracing::info!(
        dir = %data_dir.display(),
        orders = tables.orders.len(),
        lineitem = tables.lineitem.len(),
        "generated TPC-H data"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(orders: usize) -> GeneratorConfig {
        GeneratorConfig { orders, seed: 42 }
    }

    #[test]
    fn same_seed_same_tables() {
        let a = build_tables(&config(50)).unwrap();
        let b = build_tables(&config(50)).unwrap();
        assert_eq!(a.orders, b.orders);
        assert_eq!(a.lineitem, b.lineitem);
        assert_eq!(a.nation.len(), 25);
    }

    #[test]
    fn dates_stay_in_range_and_follow_orders() {
        let tables = build_tables(&config(200)).unwrap();
        let first = NaiveDate::from_ymd_opt(1992, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(1998, 8, 2).unwrap();

        for order in &tables.orders {
            let Value::Date(date) = order[4] else {
                panic!("o_orderdate is not a date");
            };
            assert!(date >= first && date <= last);
        }
        for line in &tables.lineitem {
            let (Value::Date(ship), Value::Date(receipt)) = (&line[10], &line[12]) else {
                panic!("lineitem dates are not dates");
            };
            assert!(receipt > ship);
        }
    }
}
