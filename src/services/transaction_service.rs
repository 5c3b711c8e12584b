//! services/transaction_service.rs

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        account_model::AccountRow,
        money::from_cents,
        transaction_model::{
            ListTransactionsResponse, RecordTransactionRequest, RecordTransactionResponse,
            Transaction, TransactionFilter, TransactionKind, TransactionRow,
        },
    },
    services::{
        account_service::positive_cents,
        now_rfc3339, paginate,
        signals::{BalanceChange, FinanceSignals},
    },
};

pub(crate) const TRANSACTION_SELECT: &str = r#"
    SELECT m.id, m.user_id, m.account_id, a.name AS account_name, m.name, m.kind,
           m.category, m.amount_cents, m.occurred_at, m.description, m.created_at
    FROM transactions m
    JOIN accounts a ON a.id = m.account_id
"#;

#[derive(Clone)]
pub struct TransactionService {
    db_pool: Pool<Sqlite>,
    signals: FinanceSignals,
}

impl TransactionService {
    pub fn new(db_pool: Pool<Sqlite>, signals: FinanceSignals) -> Self {
        Self { db_pool, signals }
    }

    /// Registra el movimiento y ajusta el saldo de la cuenta en una sola
    /// transacción; las notificaciones salen después del commit.
    pub async fn record_transaction(
        &self,
        user_id: i64,
        req: RecordTransactionRequest,
    ) -> Result<RecordTransactionResponse> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("El nombre del movimiento es obligatorio.").into());
        }
        let cents = positive_cents(req.amount)?;

        let category = req
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(c) = category {
            if !req.kind.accepts_category(c) {
                return Err(DomainError::validation(format!(
                    "Categoría '{}' no válida para un {}.",
                    c,
                    req.kind.display()
                ))
                .into());
            }
        }

        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, user_id, name, description, balance_cents, created_at, updated_at
            FROM accounts WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(req.account_id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo cuenta")?
        .ok_or(DomainError::NotFound("Cuenta"))?;

        let delta = match req.kind {
            TransactionKind::Income => cents,
            TransactionKind::Expense => -cents,
        };

        let now = now_rfc3339();
        let occurred_at = req
            .occurred_at
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Micros, true))
            .unwrap_or_else(|| now.clone());

        let mut tx = self.db_pool.begin().await.context("Error iniciando transacción")?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts SET balance_cents = balance_cents + ?1, updated_at = ?2
            WHERE id = ?3 AND balance_cents + ?1 >= 0
            "#,
        )
        .bind(delta)
        .bind(&now)
        .bind(account.id)
        .execute(&mut *tx)
        .await
        .context("Error actualizando saldo")?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::validation("El saldo no puede ser negativo.").into());
        }

        let id = sqlx::query(
            r#"
            INSERT INTO transactions (
                user_id, account_id, name, kind, category, amount_cents,
                occurred_at, description, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(user_id)
        .bind(account.id)
        .bind(name)
        .bind(req.kind.as_str())
        .bind(category)
        .bind(cents)
        .bind(&occurred_at)
        .bind(req.description.as_deref())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Error insertando movimiento")?
        .last_insert_rowid();

        let balance_cents: i64 = sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE id = ?1")
            .bind(account.id)
            .fetch_one(&mut *tx)
            .await
            .context("Error leyendo saldo actualizado")?;

        tx.commit().await.context("Error confirmando movimiento")?;

        let transaction = self.get_transaction(user_id, id).await?;
        let account_balance = from_cents(balance_cents);
        log::info!(
            "(record_transaction) Movimiento {} ({}) de {} en cuenta {}",
            id,
            req.kind.as_str(),
            transaction.amount,
            account.id
        );

        self.signals
            .account_balance_changed(&BalanceChange {
                account_id: account.id,
                user_id,
                account_name: account.name.clone(),
                balance: account_balance,
            })
            .await;
        self.signals
            .transaction_created(&transaction, account_balance)
            .await;

        Ok(RecordTransactionResponse {
            transaction,
            account_balance,
        })
    }

    pub async fn get_transaction(&self, user_id: i64, id: i64) -> Result<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "{TRANSACTION_SELECT} WHERE m.id = ?1 AND m.user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo movimiento")?
        .ok_or(DomainError::NotFound("Movimiento"))?;
        Transaction::try_from(row)
    }

    /// Más recientes primero.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        filter: TransactionFilter,
        page: u64,
        page_size: u64,
    ) -> Result<ListTransactionsResponse> {
        let (page, page_size, offset) = paginate(page, page_size);
        let kind = match filter {
            TransactionFilter::All => None,
            TransactionFilter::Income => Some(TransactionKind::Income.as_str()),
            TransactionFilter::Expenses => Some(TransactionKind::Expense.as_str()),
        };

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"{TRANSACTION_SELECT}
            WHERE m.user_id = ?1 AND (?2 IS NULL OR m.kind = ?2)
            ORDER BY m.occurred_at DESC, m.id DESC
            LIMIT ?3 OFFSET ?4"#
        ))
        .bind(user_id)
        .bind(kind)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando movimientos")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)",
        )
        .bind(user_id)
        .bind(kind)
        .fetch_one(&self.db_pool)
        .await
        .context("Error contando movimientos")?;

        let items = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListTransactionsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Últimos `limit` movimientos del usuario.
    pub async fn recent(&self, user_id: i64, limit: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{TRANSACTION_SELECT} WHERE m.user_id = ?1 ORDER BY m.occurred_at DESC, m.id DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await
        .context("Error leyendo movimientos recientes")?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
