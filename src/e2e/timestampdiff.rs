//! TIMESTAMPADD / TIMESTAMPDIFF end-to-end suite over `lineitem`, `orders`
//! and `nation`.

use crate::e2e::config::{ExecutionMode, Settings};
use crate::e2e::runner::{QueryCase, Runner};
use crate::storage::FileFormat;
use crate::types::error::Result;

pub const QUERY_TYPE: &str = "Timestampdiff";
pub const TABLES: [&str; 3] = ["lineitem", "orders", "nation"];
pub const FILE_FORMATS: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Parquet];

const WORDER: bool = true;
const ACCEPTABLE_DIFFERENCE: f64 = 0.01;
const USE_PERCENTAGE: bool = false;

/// `(id, engine query, SQLite query)`.
const QUERIES: &[(&str, &str, &str)] = &[
    (
        "TEST_01",
        "select l_shipdate, l_commitdate,
                timestampdiff(DAY, l_commitdate, l_shipdate) as diff
            from lineitem limit 20",
        "select l_shipdate, l_commitdate,
                (strftime('%s', l_shipdate) - strftime('%s', l_commitdate)) / 86400 as diff
            from lineitem limit 20",
    ),
    (
        "TEST_02",
        "select l_shipdate, timestampdiff(DAY, date '1970-01-01', l_shipdate) as diff
            from lineitem limit 20",
        "select l_shipdate, strftime('%s', l_shipdate) / 86400 as diff
            from lineitem limit 20",
    ),
    (
        "TEST_03",
        "select * from orders
            where timestampdiff(DAY, date '1995-02-04', o_orderdate) < 25",
        "select * from orders
            where (strftime('%s', o_orderdate) - strftime('%s', '1995-02-04')) / 86400 < 25",
    ),
    (
        "TEST_04",
        "select o_orderdate, TIMESTAMPADD(DAY, 4, o_orderdate) as add_day_col
            from orders order by o_orderkey limit 150",
        "select o_orderdate, date(o_orderdate, '+4 days') as add_day_col
            from orders order by o_orderkey limit 150",
    ),
    (
        "TEST_05",
        "select o_orderdate, TIMESTAMPADD(HOUR, 12, o_orderdate) as add_hour_col
            from orders order by o_orderkey limit 450",
        "select o_orderdate, datetime(o_orderdate, '+12 hours') as add_hour_col
            from orders order by o_orderkey limit 450",
    ),
    (
        "TEST_06",
        "select o_orderdate, TIMESTAMPADD(MINUTE, 42, o_orderdate) as add_minute_col
            from orders order by o_orderkey limit 350",
        "select o_orderdate, datetime(o_orderdate, '+42 minutes') as add_minute_col
            from orders order by o_orderkey limit 350",
    ),
    (
        "TEST_07",
        "select o_orderdate, TIMESTAMPADD(SECOND, 21, o_orderdate) as add_second_col
            from orders order by o_orderkey limit 250",
        "select o_orderdate, datetime(o_orderdate, '+21 seconds') as add_second_col
            from orders order by o_orderkey limit 250",
    ),
    (
        "TEST_08",
        "select o_orderdate,
                TIMESTAMPADD(DAY, 18, CAST(o_orderdate AS TIMESTAMP)) as add_day_col
            from orders order by o_orderkey limit 250",
        "select o_orderdate, datetime(o_orderdate, '+18 days') as add_day_col
            from orders order by o_orderkey limit 250",
    ),
    (
        "TEST_09",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 10000
            )
            select my_date, timestampadd(DAY, 17, cast(my_date as timestamp)) as add_day_col
            from date_table limit 450",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 10000
            )
            select my_date, datetime(my_date, '+17 days') as add_day_col
            from date_table limit 450",
    ),
    (
        "TEST_10",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 10000
            )
            select my_date, timestampadd(HOUR, 48, cast(my_date as timestamp)) as add_hour_col
            from date_table limit 450",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 10000
            )
            select my_date, datetime(my_date, '+48 hours') as add_hour_col
            from date_table limit 450",
    ),
    (
        "TEST_11",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 12000
            )
            select my_date, timestampadd(MINUTE, 75, cast(my_date as timestamp)) as add_minute_col
            from date_table limit 400",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 12000
            )
            select my_date, datetime(my_date, '+75 minutes') as add_minute_col
            from date_table limit 400",
    ),
    (
        "TEST_12",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 12000
            )
            select my_date, timestampadd(SECOND, 150, cast(my_date as timestamp)) as add_second_col
            from date_table limit 400",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 12000
            )
            select my_date, datetime(my_date, '+150 seconds') as add_second_col
            from date_table limit 400",
    ),
    (
        "TEST_13",
        "select TIMESTAMPADD(DAY, 22, TIMESTAMP '1995-12-10 02:06:17') as constant_col from nation",
        "select datetime('1995-12-10 02:06:17', '+22 days') as constant_col from nation",
    ),
    (
        "TEST_14",
        "select TIMESTAMPADD(DAY, 92, date '1995-07-06') as constant_col from nation",
        "select date('1995-07-06', '+92 days') as constant_col from nation",
    ),
    (
        "TEST_15",
        "select TIMESTAMPADD(HOUR, 21, TIMESTAMP '1995-12-10 02:06:17') as constant_col from nation",
        "select datetime('1995-12-10 02:06:17', '+21 hours') as constant_col from nation",
    ),
    (
        "TEST_16",
        "select TIMESTAMPADD(HOUR, 78, date '1995-07-06') as constant_col from nation",
        "select datetime('1995-07-06', '+78 hours') as constant_col from nation",
    ),
    (
        "TEST_17",
        "select TIMESTAMPADD(MINUTE, 72, TIMESTAMP '1995-12-10 02:06:17') as constant_col from nation",
        "select datetime('1995-12-10 02:06:17', '+72 minutes') as constant_col from nation",
    ),
    (
        "TEST_18",
        "select TIMESTAMPADD(MINUTE, 47, date '1995-07-06') as constant_col from nation",
        "select datetime('1995-07-06', '+47 minutes') as constant_col from nation",
    ),
    (
        "TEST_19",
        "select TIMESTAMPADD(SECOND, 105, TIMESTAMP '1995-12-10 02:06:17') as constant_col from nation",
        "select datetime('1995-12-10 02:06:17', '+105 seconds') as constant_col from nation",
    ),
    (
        "TEST_20",
        "select TIMESTAMPADD(SECOND, 16, date '1995-07-06') as constant_col from nation",
        "select datetime('1995-07-06', '+16 seconds') as constant_col from nation",
    ),
    (
        "TEST_21",
        "select TIMESTAMPDIFF(DAY, date '1995-07-06', date '1995-02-06') as constant_col from nation",
        "select (strftime('%s', '1995-02-06') - strftime('%s', '1995-07-06')) / 86400 as constant_col
            from nation",
    ),
    (
        "TEST_22",
        "select TIMESTAMPDIFF(DAY, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')
                as constant_col
            from nation",
        "select (strftime('%s', '1995-12-03 19:50:00') - strftime('%s', '1995-03-06 10:50:00')) / 86400
                as constant_col
            from nation",
    ),
    (
        "TEST_23",
        "select TIMESTAMPDIFF(HOUR, date '1995-07-06', date '1995-02-06') as constant_col from nation",
        "select (strftime('%s', '1995-02-06') - strftime('%s', '1995-07-06')) / 3600 as constant_col
            from nation",
    ),
    (
        "TEST_24",
        "select TIMESTAMPDIFF(HOUR, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')
                as constant_col
            from nation",
        "select (strftime('%s', '1995-12-03 19:50:00') - strftime('%s', '1995-03-06 10:50:00')) / 3600
                as constant_col
            from nation",
    ),
    (
        "TEST_25",
        "select TIMESTAMPDIFF(MINUTE, date '1995-07-06', date '1995-02-06') as constant_col from nation",
        "select (strftime('%s', '1995-02-06') - strftime('%s', '1995-07-06')) / 60 as constant_col
            from nation",
    ),
    (
        "TEST_26",
        "select TIMESTAMPDIFF(MINUTE, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')
                as constant_col
            from nation",
        "select (strftime('%s', '1995-12-03 19:50:00') - strftime('%s', '1995-03-06 10:50:00')) / 60
                as constant_col
            from nation",
    ),
    (
        "TEST_27",
        "select TIMESTAMPDIFF(SECOND, date '1995-07-06', date '1995-02-06') as constant_col from nation",
        "select strftime('%s', '1995-02-06') - strftime('%s', '1995-07-06') as constant_col
            from nation",
    ),
    (
        "TEST_28",
        "select TIMESTAMPDIFF(SECOND, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')
                as constant_col
            from nation",
        "select strftime('%s', '1995-12-03 19:50:00') - strftime('%s', '1995-03-06 10:50:00')
                as constant_col
            from nation",
    ),
    (
        "TEST_29",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 10000
            ) select my_date,
                timestampdiff(DAY, CAST(my_date AS TIMESTAMP), TIMESTAMP '1996-12-01 12:00:01')
                    as diff_day_col
            from date_table limit 450",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 10000
            ) select my_date,
                (strftime('%s', '1996-12-01 12:00:01') - strftime('%s', my_date)) / 86400
                    as diff_day_col
            from date_table limit 450",
    ),
    (
        "TEST_30",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 10000
            ) select my_date,
                timestampdiff(HOUR, CAST(my_date AS TIMESTAMP), TIMESTAMP '1996-12-01 12:00:01')
                    as diff_hour_col
            from date_table limit 450",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 10000
            ) select my_date,
                (strftime('%s', '1996-12-01 12:00:01') - strftime('%s', my_date)) / 3600
                    as diff_hour_col
            from date_table limit 450",
    ),
    (
        "TEST_31",
        "with date_table as (
                select cast(o_orderdate as date) as my_date from
                orders order by o_orderkey limit 12000
            ) select my_date,
                timestampdiff(MINUTE, CAST(my_date AS TIMESTAMP), TIMESTAMP '1996-12-01 12:00:01')
                    as diff_minute_col
            from date_table limit 400",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 12000
            ) select my_date,
                (strftime('%s', '1996-12-01 12:00:01') - strftime('%s', my_date)) / 60
                    as diff_minute_col
            from date_table limit 400",
    ),
    (
        "TEST_32",
        "with date_table as (
                select cast(o_orderdate as date) as my_date
                from orders order by o_orderkey limit 12000
            ) select my_date,
                timestampdiff(SECOND, CAST(my_date AS TIMESTAMP), TIMESTAMP '1996-12-01 12:00:01')
                    as diff_second_col
            from date_table limit 400",
        "with date_table as (
                select o_orderdate as my_date from orders order by o_orderkey limit 12000
            ) select my_date,
                strftime('%s', '1996-12-01 12:00:01') - strftime('%s', my_date)
                    as diff_second_col
            from date_table limit 400",
    ),
];

pub fn cases() -> Vec<QueryCase> {
    QUERIES
        .iter()
        .map(|(id, query, reference)| QueryCase {
            worder: WORDER,
            order_by: None,
            acceptable_difference: ACCEPTABLE_DIFFERENCE,
            use_percentage: USE_PERCENTAGE,
            ..QueryCase::new(id, query).with_reference(reference)
        })
        .collect()
}

/// Runs every case once per file format the settings do not skip.
pub fn execution_test(runner: &mut Runner, settings: &Settings) -> Result<()> {
    let cases = cases();

    for file_format in FILE_FORMATS {
        if settings.skip_test(file_format, QUERY_TYPE) {
            tracing::info!(query_type = QUERY_TYPE, format = %file_format, "skipping format");
            continue;
        }

        runner.create_tables(file_format, &TABLES)?;
        tracing::info!(
            query_type = QUERY_TYPE,
            format = %file_format,
            cases = cases.len(),
            "running suite"
        );
        for case in &cases {
            runner.run_query(case, QUERY_TYPE, file_format);
        }

        // Reference results do not depend on the file format.
        if settings.run.execution_mode == ExecutionMode::Generator {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::parser::SQLParser;

    #[test]
    fn every_case_has_a_unique_id_and_parses() {
        let cases = cases();
        assert_eq!(cases.len(), 32);
        assert_eq!(cases[0].id, "TEST_01");
        assert_eq!(cases[31].id, "TEST_32");

        let parser = SQLParser::new();
        for case in &cases {
            assert!(parser.parse(&case.query).is_ok(), "{} does not parse", case.id);
            assert!(case.reference_query.is_some());
        }
    }

    #[test]
    fn constant_cases_evaluate_without_tables() {
        let db = Database::new();
        let result = db
            .execute(
                "select TIMESTAMPDIFF(DAY, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')",
            )
            .unwrap();
        assert_eq!(result.into_rows()[0][0].to_string(), "272");
    }
}
