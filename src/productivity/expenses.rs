use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate, TimeZone, Weekday};
use clap::ValueEnum;
use now::DateTimeNow;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::DaybookError, store::csv_store::CsvStore};

pub const EXPENSES_FILE_NAME: &str = "expenses.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub date: NaiveDate,
    pub category: String,
    #[serde(serialize_with = "two_decimals")]
    pub amount: f64,
    pub note: Option<String>,
}

fn two_decimals<S: serde::Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{amount:.2}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    Day,
    /// ISO week, Monday through Sunday.
    Week,
    Month,
}

#[derive(Debug, PartialEq)]
pub struct ExpenseSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Largest category first.
    pub categories: Vec<(String, f64)>,
    pub total: f64,
    pub count: usize,
}

pub struct ExpenseTracker {
    store: CsvStore<Expense>,
}

impl ExpenseTracker {
    pub fn new(path: PathBuf) -> Self {
        Self {
            store: CsvStore::new(path),
        }
    }

    pub async fn add(
        &self,
        category: &str,
        amount: f64,
        date: NaiveDate,
        note: Option<String>,
    ) -> Result<Expense> {
        if !amount.is_finite() || amount < 0. {
            return Err(DaybookError::InvalidAmount(amount).into());
        }
        let expense = Expense {
            date,
            category: category.trim().to_string(),
            amount,
            note: note.filter(|v| !v.trim().is_empty()),
        };
        info!("Adding expense {expense:?}");
        self.store.append(&expense).await?;
        Ok(expense)
    }

    /// Both bounds are inclusive.
    pub async fn list(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Expense>> {
        let mut expenses = self
            .store
            .load()
            .await?
            .into_iter()
            .filter(|e| start.map_or(true, |start| e.date >= start))
            .filter(|e| end.map_or(true, |end| e.date <= end))
            .collect::<Vec<_>>();
        expenses.sort_by_key(|e| e.date);
        Ok(expenses)
    }

    pub async fn summarize(&self, period: Period, reference: NaiveDate) -> Result<ExpenseSummary> {
        let (start, end) = period_bounds(period, reference);
        let expenses = self.list(Some(start), Some(end)).await?;

        let mut totals = BTreeMap::<String, f64>::new();
        for expense in &expenses {
            *totals.entry(expense.category.clone()).or_default() += expense.amount;
        }
        let mut categories = totals.into_iter().collect::<Vec<_>>();
        categories.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ExpenseSummary {
            start,
            end,
            total: categories.iter().fold(0., |total, v| total + v.1),
            categories,
            count: expenses.len(),
        })
    }
}

fn period_bounds(period: Period, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Day => (reference, reference),
        Period::Week => {
            let week = reference.week(Weekday::Mon);
            (week.first_day(), week.last_day())
        }
        Period::Month => {
            // Noon avoids DST gaps at midnight.
            let Some(moment) = reference
                .and_hms_opt(12, 0, 0)
                .and_then(|v| Local.from_local_datetime(&v).earliest())
            else {
                return month_bounds_naive(reference);
            };
            (
                moment.beginning_of_month().date_naive(),
                moment.end_of_month().date_naive(),
            )
        }
    }
}

fn month_bounds_naive(reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = reference.with_day(1).unwrap_or(reference);
    let end = start
        .checked_add_months(chrono::Months::new(1))
        .and_then(|v| v.pred_opt())
        .unwrap_or(reference);
    (start, end)
}
