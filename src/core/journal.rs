//! Double-entry journal entries.
//!
//! The balance check is a pure function over the submitted lines: an entry
//! balances when total debits and total credits differ by less than
//! [`BALANCE_EPSILON`], and it may only be posted once it balances and has at
//! least [`MIN_LINES`] lines. Posting writes the header and its lines in one
//! database transaction.

use crate::{
    core::{audit, tenant::TenantContext, validate},
    entities::{JournalEntry, JournalLine as JournalLineEntity, journal_entry, journal_line},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// Largest debit/credit difference still treated as balanced
pub const BALANCE_EPSILON: f64 = 0.01;

/// Fewest lines a postable entry may have
pub const MIN_LINES: usize = 2;

/// One line of a journal entry being composed.
///
/// A line is either a debit or a credit; [`JournalLine::set_debit`] and
/// [`JournalLine::set_credit`] keep the two mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Chart-of-accounts code
    pub account_code: String,
    /// Optional memo
    #[serde(default)]
    pub memo: Option<String>,
    /// Debit amount
    #[serde(default)]
    pub debit: f64,
    /// Credit amount
    #[serde(default)]
    pub credit: f64,
}

impl JournalLine {
    /// A debit line.
    pub fn debit(account_code: impl Into<String>, amount: f64) -> Self {
        let mut line = Self::empty(account_code);
        line.set_debit(amount);
        line
    }

    /// A credit line.
    pub fn credit(account_code: impl Into<String>, amount: f64) -> Self {
        let mut line = Self::empty(account_code);
        line.set_credit(amount);
        line
    }

    fn empty(account_code: impl Into<String>) -> Self {
        Self {
            account_code: account_code.into(),
            memo: None,
            debit: 0.0,
            credit: 0.0,
        }
    }

    /// Sets the debit; a positive debit clears the credit.
    pub fn set_debit(&mut self, amount: f64) {
        self.debit = amount;
        if amount > 0.0 {
            self.credit = 0.0;
        }
    }

    /// Sets the credit; a positive credit clears the debit.
    pub fn set_credit(&mut self, amount: f64) {
        self.credit = amount;
        if amount > 0.0 {
            self.debit = 0.0;
        }
    }
}

/// Debit and credit sums of a set of lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JournalTotals {
    /// Sum of debits
    pub debits: f64,
    /// Sum of credits
    pub credits: f64,
}

impl JournalTotals {
    /// Sums the lines.
    #[must_use]
    pub fn of(lines: &[JournalLine]) -> Self {
        lines.iter().fold(
            Self {
                debits: 0.0,
                credits: 0.0,
            },
            |acc, line| Self {
                debits: acc.debits + line.debit,
                credits: acc.credits + line.credit,
            },
        )
    }

    /// Absolute difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> f64 {
        (self.debits - self.credits).abs()
    }

    /// Whether the difference is below [`BALANCE_EPSILON`].
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.difference() < BALANCE_EPSILON
    }
}

/// Result of checking a draft entry, as shown next to the submit control
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceCheck {
    /// Sum of debits
    pub total_debits: f64,
    /// Sum of credits
    pub total_credits: f64,
    /// Absolute difference
    pub difference: f64,
    /// Difference below epsilon
    pub is_balanced: bool,
    /// Balanced and at least two lines
    pub can_submit: bool,
}

/// Checks a draft entry without touching the store.
#[must_use]
pub fn check_balance(lines: &[JournalLine]) -> BalanceCheck {
    let totals = JournalTotals::of(lines);
    BalanceCheck {
        total_debits: totals.debits,
        total_credits: totals.credits,
        difference: totals.difference(),
        is_balanced: totals.is_balanced(),
        can_submit: lines.len() >= MIN_LINES && totals.is_balanced(),
    }
}

/// Whether an entry with these lines may be posted.
#[must_use]
pub fn can_submit(lines: &[JournalLine]) -> bool {
    check_balance(lines).can_submit
}

fn validate_line(index: usize, line: &JournalLine) -> Result<()> {
    let position = index + 1;
    validate::require_text(&format!("Line {position} account"), &line.account_code)?;
    validate::ensure_amount(line.debit)?;
    validate::ensure_amount(line.credit)?;

    if line.debit > 0.0 && line.credit > 0.0 {
        return Err(Error::validation(format!(
            "Line {position} has both a debit and a credit"
        )));
    }
    if line.debit == 0.0 && line.credit == 0.0 {
        return Err(Error::validation(format!(
            "Line {position} has neither a debit nor a credit"
        )));
    }
    Ok(())
}

/// Input for [`create_journal_entry`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewJournalEntry {
    /// Accounting date
    pub entry_date: NaiveDate,
    /// Narrative
    pub description: String,
    /// External reference
    #[serde(default)]
    pub reference: Option<String>,
    /// Lines in display order
    pub lines: Vec<JournalLine>,
}

/// A posted entry with its lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntryWithLines {
    /// Header row
    #[serde(flatten)]
    pub entry: journal_entry::Model,
    /// Lines ordered by line number
    pub lines: Vec<journal_line::Model>,
}

/// Validates and posts a journal entry.
///
/// Rejects the entry with [`Error::UnbalancedEntry`] whenever it could not be
/// submitted from the entry form: unbalanced, or fewer than two lines.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id, lines = input.lines.len()))]
pub async fn create_journal_entry(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewJournalEntry,
) -> Result<JournalEntryWithLines> {
    let description = validate::require_text("Description", &input.description)?;
    for (index, line) in input.lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    let check = check_balance(&input.lines);
    if !check.can_submit {
        return Err(Error::UnbalancedEntry {
            debits: check.total_debits,
            credits: check.total_credits,
            line_count: input.lines.len(),
        });
    }

    let txn = db.begin().await?;

    let entry = journal_entry::ActiveModel {
        company_id: Set(ctx.company_id),
        entry_date: Set(input.entry_date),
        description: Set(description),
        reference: Set(input.reference),
        total_debit: Set(check.total_debits),
        total_credit: Set(check.total_credits),
        created_by: Set(ctx.user_id.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for (index, line) in input.lines.into_iter().enumerate() {
        let line_number = i32::try_from(index + 1)?;
        let saved = journal_line::ActiveModel {
            entry_id: Set(entry.id),
            line_number: Set(line_number),
            account_code: Set(line.account_code.trim().to_string()),
            memo: Set(line.memo),
            debit: Set(line.debit),
            credit: Set(line.credit),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        lines.push(saved);
    }

    audit::record(
        &txn,
        ctx,
        "journal_entry.create",
        "journal_entry",
        Some(entry.id.to_string()),
        Some(format!("{:.2}", check.total_debits)),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(entry_id = entry.id, "Journal entry posted");

    Ok(JournalEntryWithLines { entry, lines })
}

/// Fetches one of the caller's entries with its lines.
pub async fn get_journal_entry(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    entry_id: i64,
) -> Result<JournalEntryWithLines> {
    let entry = JournalEntry::find_by_id(entry_id)
        .filter(journal_entry::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("journal entry", entry_id))?;

    let lines = JournalLineEntity::find()
        .filter(journal_line::Column::EntryId.eq(entry.id))
        .order_by_asc(journal_line::Column::LineNumber)
        .all(db)
        .await?;

    Ok(JournalEntryWithLines { entry, lines })
}

/// The caller's entries, most recent accounting date first.
pub async fn list_journal_entries(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<journal_entry::Model>> {
    JournalEntry::find()
        .filter(journal_entry::Column::CompanyId.eq(ctx.company_id))
        .order_by_desc(journal_entry::Column::EntryDate)
        .order_by_desc(journal_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn entry(lines: Vec<JournalLine>) -> NewJournalEntry {
        NewJournalEntry {
            entry_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            description: "Progress billing".to_string(),
            reference: Some("INV-7".to_string()),
            lines,
        }
    }

    #[test]
    fn test_balanced_pair() {
        let lines = vec![
            JournalLine::debit("1200", 500.0),
            JournalLine::credit("4000", 500.0),
        ];
        let check = check_balance(&lines);
        assert!(check.is_balanced);
        assert_eq!(check.total_debits, 500.0);
        assert_eq!(check.total_credits, 500.0);
        assert!(check.can_submit);
    }

    #[test]
    fn test_unbalanced_pair() {
        let lines = vec![
            JournalLine::debit("1200", 500.0),
            JournalLine::credit("4000", 300.0),
        ];
        let check = check_balance(&lines);
        assert!(!check.is_balanced);
        assert_eq!(check.difference, 200.0);
        assert!(!check.can_submit);
    }

    #[test]
    fn test_single_line_cannot_submit() {
        let lines = vec![JournalLine::debit("1200", 0.0)];
        assert!(check_balance(&lines).is_balanced);
        assert!(!can_submit(&lines));
        assert!(!can_submit(&[]));
    }

    #[test]
    fn test_epsilon_absorbs_rounding() {
        let lines = vec![
            JournalLine::debit("1200", 0.1),
            JournalLine::debit("1210", 0.2),
            JournalLine::credit("4000", 0.3),
        ];
        assert!(can_submit(&lines));

        let off_by_a_cent = vec![
            JournalLine::debit("1200", 100.0),
            JournalLine::credit("4000", 99.99),
        ];
        assert!(!check_balance(&off_by_a_cent).is_balanced);
    }

    #[test]
    fn test_debit_and_credit_are_mutually_exclusive() {
        let mut line = JournalLine::credit("2000", 75.0);
        line.set_debit(40.0);
        assert_eq!(line.debit, 40.0);
        assert_eq!(line.credit, 0.0);

        line.set_credit(12.0);
        assert_eq!(line.credit, 12.0);
        assert_eq!(line.debit, 0.0);
    }

    #[test]
    fn test_balance_property_over_random_lines() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let count = rng.gen_range(0..6);
            let lines: Vec<JournalLine> = (0..count)
                .map(|i| {
                    let amount = f64::from(rng.gen_range(0..100_000)) / 100.0;
                    if rng.gen_bool(0.5) {
                        JournalLine::debit(format!("{i}"), amount)
                    } else {
                        JournalLine::credit(format!("{i}"), amount)
                    }
                })
                .collect();

            let debits: f64 = lines.iter().map(|l| l.debit).sum();
            let credits: f64 = lines.iter().map(|l| l.credit).sum();
            let expected = (debits - credits).abs() < BALANCE_EPSILON;

            let check = check_balance(&lines);
            assert_eq!(check.is_balanced, expected);
            assert_eq!(check.can_submit, expected && lines.len() >= MIN_LINES);
            assert!(lines.iter().all(|l| l.debit == 0.0 || l.credit == 0.0));
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unbalanced_before_touching_store() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = TenantContext::user(1, "alice");

        let result = create_journal_entry(
            &db,
            &ctx,
            entry(vec![
                JournalLine::debit("1200", 500.0),
                JournalLine::credit("4000", 300.0),
            ]),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::UnbalancedEntry { debits, credits, line_count: 2 })
                if debits == 500.0 && credits == 300.0
        ));

        let result = create_journal_entry(&db, &ctx, entry(vec![])).await;
        assert!(matches!(result, Err(Error::UnbalancedEntry { line_count: 0, .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_lines() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = TenantContext::user(1, "alice");

        let both = JournalLine {
            account_code: "1200".to_string(),
            memo: None,
            debit: 10.0,
            credit: 10.0,
        };
        let result =
            create_journal_entry(&db, &ctx, entry(vec![both, JournalLine::credit("4000", 0.0)])).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let negative = JournalLine {
            account_code: "1200".to_string(),
            memo: None,
            debit: -10.0,
            credit: 0.0,
        };
        let result = create_journal_entry(
            &db,
            &ctx,
            entry(vec![negative, JournalLine::credit("4000", 10.0)]),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = create_journal_entry(
            &db,
            &ctx,
            entry(vec![
                JournalLine::debit(" ", 10.0),
                JournalLine::credit("4000", 10.0),
            ]),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_fetch_integration() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "bookkeeper");

        let posted = create_journal_entry(
            &db,
            &ctx,
            entry(vec![
                JournalLine::debit("1200", 500.0),
                JournalLine::credit("4000", 450.0),
                JournalLine::credit("2200", 50.0),
            ]),
        )
        .await?;
        assert_eq!(posted.entry.total_debit, 500.0);
        assert_eq!(posted.entry.total_credit, 500.0);
        assert_eq!(posted.lines.len(), 3);
        assert_eq!(posted.lines[2].line_number, 3);

        let fetched = get_journal_entry(&db, &ctx, posted.entry.id).await?;
        assert_eq!(fetched, posted);
        assert_eq!(list_journal_entries(&db, &ctx).await?.len(), 1);

        let stranger = TenantContext::user(company.id + 1, "mallory");
        assert!(get_journal_entry(&db, &stranger, posted.entry.id).await.is_err());

        let audit = crate::core::audit::list_audit_logs(&db, &ctx, &Default::default()).await?;
        assert_eq!(audit[0].action, "journal_entry.create");
        Ok(())
    }
}
