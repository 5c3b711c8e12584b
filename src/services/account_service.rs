//! services/account_service.rs
//! Cuentas principales, subcuentas y transferencias entre ellas.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        account_model::{
            Account, AccountRow, CreateAccountRequest, CreateSubAccountRequest,
            MainAccountTransferRequest, MainTransferKind, SubAccount, SubAccountKind, SubAccountRow,
            SubAccountTransferRequest, TransferReceipt, DEFAULT_SUB_ACCOUNT_COLOR,
        },
        money::{from_cents, to_cents},
    },
    services::{
        now_rfc3339,
        signals::{BalanceChange, FinanceSignals},
    },
};

const SUB_ACCOUNT_SELECT: &str = r#"
    SELECT s.id, s.account_id, s.owner_id, COALESCE(s.owner_id, a.user_id) AS user_id,
           s.name, s.description, s.kind, s.color, s.balance_cents, s.active,
           s.is_business, s.target_cents, s.target_date, s.created_at, s.updated_at
    FROM sub_accounts s
    LEFT JOIN accounts a ON a.id = s.account_id
"#;

/// Monto positivo convertido a centavos.
pub(crate) fn positive_cents(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("El monto debe ser mayor a cero.").into());
    }
    to_cents(amount)
        .filter(|c| *c > 0)
        .ok_or_else(|| DomainError::validation("Monto inválido.").into())
}

#[derive(Clone)]
pub struct AccountService {
    db_pool: Pool<Sqlite>,
    signals: FinanceSignals,
}

impl AccountService {
    pub fn new(db_pool: Pool<Sqlite>, signals: FinanceSignals) -> Self {
        Self { db_pool, signals }
    }

    // ------------------------------------------------------------
    // Cuentas principales
    // ------------------------------------------------------------

    pub async fn create_account(&self, user_id: i64, req: CreateAccountRequest) -> Result<Account> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("El nombre de la cuenta es obligatorio.").into());
        }
        let initial = req.initial_balance.unwrap_or(Decimal::ZERO);
        if initial < Decimal::ZERO {
            return Err(DomainError::validation("El saldo inicial no puede ser negativo.").into());
        }
        let cents = to_cents(initial).ok_or_else(|| DomainError::validation("Saldo inicial inválido."))?;

        let user_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error buscando usuario")?;
        if user_exists.is_none() {
            return Err(DomainError::NotFound("Usuario").into());
        }

        let now = now_rfc3339();
        let id = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, name, description, balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(req.description.as_deref().unwrap_or(""))
        .bind(cents)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error creando cuenta")?
        .last_insert_rowid();

        log::info!("(create_account) Cuenta {} creada para usuario {}", id, user_id);
        self.get_account(user_id, id).await
    }

    async fn account_row(&self, user_id: i64, account_id: i64) -> Result<AccountRow> {
        sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, user_id, name, description, balance_cents, created_at, updated_at
            FROM accounts WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo cuenta")?
        .ok_or_else(|| DomainError::NotFound("Cuenta").into())
    }

    /// Suma de saldos de subcuentas vinculadas, activas o no.
    async fn allocated_cents(&self, account_id: i64) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(balance_cents), 0) FROM sub_accounts WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error sumando saldos de subcuentas")
    }

    pub async fn get_account(&self, user_id: i64, account_id: i64) -> Result<Account> {
        let row = self.account_row(user_id, account_id).await?;
        let allocated = self.allocated_cents(row.id).await?;
        Ok(Account::from_row(row, allocated))
    }

    pub async fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, user_id, name, description, balance_cents, created_at, updated_at
            FROM accounts WHERE user_id = ?1 ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando cuentas")?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            let allocated = self.allocated_cents(row.id).await?;
            accounts.push(Account::from_row(row, allocated));
        }
        Ok(accounts)
    }

    /// saldo - saldo asignado a subcuentas vinculadas
    pub async fn available_balance(&self, user_id: i64, account_id: i64) -> Result<Decimal> {
        Ok(self.get_account(user_id, account_id).await?.available_balance)
    }

    // ------------------------------------------------------------
    // Subcuentas
    // ------------------------------------------------------------

    pub async fn create_sub_account(&self, user_id: i64, req: CreateSubAccountRequest) -> Result<SubAccount> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("El nombre de la subcuenta es obligatorio.").into());
        }

        let account = match req.account_id {
            Some(id) => Some(self.account_row(user_id, id).await?),
            None => None,
        };
        let owner_id = if req.independent.unwrap_or(false) {
            Some(user_id)
        } else {
            None
        };

        if account.is_none() && owner_id.is_none() {
            return Err(DomainError::validation(
                "Una subcuenta debe tener una cuenta principal o un propietario directo",
            )
            .into());
        }
        if let (Some(acc), Some(owner)) = (&account, owner_id) {
            if acc.user_id != owner {
                return Err(DomainError::validation(
                    "El propietario debe coincidir con el usuario de la cuenta principal",
                )
                .into());
            }
        }

        let initial = req.initial_balance.unwrap_or(Decimal::ZERO);
        if initial < Decimal::ZERO {
            return Err(DomainError::validation("El saldo inicial no puede ser negativo.").into());
        }
        let initial_cents = to_cents(initial).ok_or_else(|| DomainError::validation("Saldo inicial inválido."))?;

        // El saldo inicial de una subcuenta vinculada sale del disponible de la cuenta
        if let Some(acc) = &account {
            let available = acc.balance_cents - self.allocated_cents(acc.id).await?;
            if initial_cents > available {
                return Err(DomainError::InsufficientFunds {
                    available: from_cents(available),
                }
                .into());
            }
        }

        let target_cents = match req.target_amount {
            Some(t) if t <= Decimal::ZERO => {
                return Err(DomainError::validation("El monto objetivo debe ser mayor a cero.").into());
            }
            Some(t) => Some(to_cents(t).ok_or_else(|| DomainError::validation("Monto objetivo inválido."))?),
            None => None,
        };

        let kind = req.kind.unwrap_or(SubAccountKind::Otros);
        let color = match req.color.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() && !c.eq_ignore_ascii_case(DEFAULT_SUB_ACCOUNT_COLOR) => c.to_string(),
            _ => kind.color().to_string(),
        };

        let now = now_rfc3339();
        let id = sqlx::query(
            r#"
            INSERT INTO sub_accounts (
                account_id, owner_id, name, description, kind, color, balance_cents,
                active, is_business, target_cents, target_date, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(account.as_ref().map(|a| a.id))
        .bind(owner_id)
        .bind(name)
        .bind(req.description.as_deref())
        .bind(kind.as_str())
        .bind(color)
        .bind(initial_cents)
        .bind(kind.is_business())
        .bind(target_cents)
        .bind(req.target_date.map(|d| d.to_string()))
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error creando subcuenta")?
        .last_insert_rowid();

        log::info!(
            "(create_sub_account) Subcuenta {} ({}) creada para usuario {}",
            id,
            kind.as_str(),
            user_id
        );
        self.get_sub_account(user_id, id).await
    }

    async fn sub_account_row(&self, user_id: i64, id: i64) -> Result<SubAccountRow> {
        sqlx::query_as::<_, SubAccountRow>(&format!(
            "{SUB_ACCOUNT_SELECT} WHERE s.id = ?1 AND COALESCE(s.owner_id, a.user_id) = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo subcuenta")?
        .ok_or_else(|| DomainError::NotFound("Subcuenta").into())
    }

    pub async fn get_sub_account(&self, user_id: i64, id: i64) -> Result<SubAccount> {
        Ok(SubAccount::from_row_now(self.sub_account_row(user_id, id).await?))
    }

    /// Subcuentas vinculadas a sus cuentas y las independientes.
    pub async fn list_sub_accounts(&self, user_id: i64, include_inactive: bool) -> Result<Vec<SubAccount>> {
        let rows = sqlx::query_as::<_, SubAccountRow>(&format!(
            r#"{SUB_ACCOUNT_SELECT}
            WHERE COALESCE(s.owner_id, a.user_id) = ?1 AND (?2 OR s.active = 1)
            ORDER BY s.id"#
        ))
        .bind(user_id)
        .bind(include_inactive)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando subcuentas")?;

        Ok(rows.into_iter().map(SubAccount::from_row_now).collect())
    }

    pub async fn deactivate_sub_account(&self, user_id: i64, id: i64) -> Result<SubAccount> {
        let row = self.sub_account_row(user_id, id).await?;
        sqlx::query("UPDATE sub_accounts SET active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(now_rfc3339())
            .bind(row.id)
            .execute(&self.db_pool)
            .await
            .context("Error desactivando subcuenta")?;

        log::info!("(deactivate_sub_account) Subcuenta {} desactivada", id);
        self.get_sub_account(user_id, id).await
    }

    // ------------------------------------------------------------
    // Transferencias
    // ------------------------------------------------------------

    pub async fn transfer_between_sub_accounts(
        &self,
        user_id: i64,
        req: SubAccountTransferRequest,
    ) -> Result<TransferReceipt> {
        if req.from_id == req.to_id {
            return Err(DomainError::validation("No puedes transferir a la misma subcuenta.").into());
        }
        let cents = positive_cents(req.amount)?;

        let from = self.sub_account_row(user_id, req.from_id).await?;
        let to = self.sub_account_row(user_id, req.to_id).await?;
        if !from.active || !to.active {
            return Err(DomainError::validation("No se puede transferir con una subcuenta inactiva.").into());
        }

        let now = now_rfc3339();
        let mut tx = self.db_pool.begin().await.context("Error iniciando transacción")?;

        let debited = sqlx::query(
            r#"
            UPDATE sub_accounts SET balance_cents = balance_cents - ?1, updated_at = ?2
            WHERE id = ?3 AND balance_cents >= ?1
            "#,
        )
        .bind(cents)
        .bind(&now)
        .bind(from.id)
        .execute(&mut *tx)
        .await
        .context("Error debitando subcuenta origen")?;

        if debited.rows_affected() == 0 {
            return Err(DomainError::InsufficientFunds {
                available: from_cents(from.balance_cents),
            }
            .into());
        }

        sqlx::query("UPDATE sub_accounts SET balance_cents = balance_cents + ?1, updated_at = ?2 WHERE id = ?3")
            .bind(cents)
            .bind(&now)
            .bind(to.id)
            .execute(&mut *tx)
            .await
            .context("Error acreditando subcuenta destino")?;

        let transfer_id = sqlx::query(
            r#"
            INSERT INTO sub_account_transfers (from_id, to_id, amount_cents, description, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(from.id)
        .bind(to.id)
        .bind(cents)
        .bind(req.description.as_deref())
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Error registrando transferencia")?
        .last_insert_rowid();

        tx.commit().await.context("Error confirmando transferencia")?;

        let source = self.sub_account_row(user_id, from.id).await?;
        let target = self.sub_account_row(user_id, to.id).await?;
        log::info!(
            "(transfer_between_sub_accounts) {} -> {} por {} centavos",
            from.id,
            to.id,
            cents
        );

        let amount = from_cents(cents);
        self.signals
            .transfer_made(
                user_id,
                transfer_id,
                amount,
                &format!("de '{}' a '{}'", source.name, target.name),
            )
            .await;

        Ok(TransferReceipt {
            transfer_id,
            amount,
            source_balance: from_cents(source.balance_cents),
            target_balance: from_cents(target.balance_cents),
            message: format!(
                "Transferencia de {} realizada de '{}' a '{}'.",
                amount, source.name, target.name
            ),
        })
    }

    /// Movimientos entre una subcuenta y la cuenta principal.
    ///
    /// `withdrawal` (principal -> subcuenta): si la subcuenta está vinculada el
    /// monto sale del disponible y la cuenta no cambia; si es independiente se
    /// descuenta del saldo de la cuenta.
    /// `deposit` (subcuenta -> principal): se descuenta de la subcuenta y, si es
    /// independiente, se acredita a la cuenta.
    pub async fn transfer_with_main_account(
        &self,
        user_id: i64,
        sub_account_id: i64,
        req: MainAccountTransferRequest,
    ) -> Result<TransferReceipt> {
        let cents = positive_cents(req.amount)?;
        let sub = self.sub_account_row(user_id, sub_account_id).await?;
        if !sub.active {
            return Err(DomainError::validation("La subcuenta está inactiva.").into());
        }

        let account_id = req
            .account_id
            .or(sub.account_id)
            .ok_or_else(|| DomainError::validation("Debe indicar la cuenta principal."))?;
        let account = self.account_row(user_id, account_id).await?;

        let linked = match sub.account_id {
            Some(id) if id == account.id => true,
            Some(_) => {
                return Err(DomainError::validation("La subcuenta no pertenece a esa cuenta principal.").into());
            }
            None => false,
        };

        let now = now_rfc3339();
        let mut account_delta = 0i64;
        let mut tx = self.db_pool.begin().await.context("Error iniciando transacción")?;

        match req.kind {
            MainTransferKind::Withdrawal => {
                if linked {
                    let allocated: i64 = sqlx::query_scalar(
                        "SELECT COALESCE(SUM(balance_cents), 0) FROM sub_accounts WHERE account_id = ?1",
                    )
                    .bind(account.id)
                    .fetch_one(&mut *tx)
                    .await
                    .context("Error calculando saldo disponible")?;
                    let available = account.balance_cents - allocated;
                    if cents > available {
                        return Err(DomainError::InsufficientFunds {
                            available: from_cents(available),
                        }
                        .into());
                    }
                } else {
                    let debited = sqlx::query(
                        r#"
                        UPDATE accounts SET balance_cents = balance_cents - ?1, updated_at = ?2
                        WHERE id = ?3 AND balance_cents >= ?1
                        "#,
                    )
                    .bind(cents)
                    .bind(&now)
                    .bind(account.id)
                    .execute(&mut *tx)
                    .await
                    .context("Error debitando cuenta principal")?;
                    if debited.rows_affected() == 0 {
                        return Err(DomainError::InsufficientFunds {
                            available: from_cents(account.balance_cents),
                        }
                        .into());
                    }
                    account_delta = -cents;
                }

                sqlx::query(
                    "UPDATE sub_accounts SET balance_cents = balance_cents + ?1, updated_at = ?2 WHERE id = ?3",
                )
                .bind(cents)
                .bind(&now)
                .bind(sub.id)
                .execute(&mut *tx)
                .await
                .context("Error acreditando subcuenta")?;
            }
            MainTransferKind::Deposit => {
                let debited = sqlx::query(
                    r#"
                    UPDATE sub_accounts SET balance_cents = balance_cents - ?1, updated_at = ?2
                    WHERE id = ?3 AND balance_cents >= ?1
                    "#,
                )
                .bind(cents)
                .bind(&now)
                .bind(sub.id)
                .execute(&mut *tx)
                .await
                .context("Error debitando subcuenta")?;
                if debited.rows_affected() == 0 {
                    return Err(DomainError::InsufficientFunds {
                        available: from_cents(sub.balance_cents),
                    }
                    .into());
                }

                if !linked {
                    sqlx::query(
                        "UPDATE accounts SET balance_cents = balance_cents + ?1, updated_at = ?2 WHERE id = ?3",
                    )
                    .bind(cents)
                    .bind(&now)
                    .bind(account.id)
                    .execute(&mut *tx)
                    .await
                    .context("Error acreditando cuenta principal")?;
                    account_delta = cents;
                }
            }
        }

        let transfer_id = sqlx::query(
            r#"
            INSERT INTO main_account_transfers
                (sub_account_id, account_id, amount_cents, kind, description, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(sub.id)
        .bind(account.id)
        .bind(cents)
        .bind(req.kind.as_str())
        .bind(req.description.as_deref())
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Error registrando transferencia con cuenta principal")?
        .last_insert_rowid();

        tx.commit().await.context("Error confirmando transferencia")?;

        let sub_after = self.sub_account_row(user_id, sub.id).await?;
        let account_after = self.account_row(user_id, account.id).await?;
        log::info!(
            "(transfer_with_main_account) {} subcuenta={} cuenta={} centavos={}",
            req.kind.as_str(),
            sub.id,
            account.id,
            cents
        );

        if account_delta != 0 {
            self.signals
                .account_balance_changed(&BalanceChange {
                    account_id: account_after.id,
                    user_id,
                    account_name: account_after.name.clone(),
                    balance: from_cents(account_after.balance_cents),
                })
                .await;
        }

        let amount = from_cents(cents);
        let (source_balance, target_balance, detail) = match req.kind {
            MainTransferKind::Withdrawal => (
                from_cents(account_after.balance_cents),
                from_cents(sub_after.balance_cents),
                format!("de '{}' a '{}'", account_after.name, sub_after.name),
            ),
            MainTransferKind::Deposit => (
                from_cents(sub_after.balance_cents),
                from_cents(account_after.balance_cents),
                format!("de '{}' a '{}'", sub_after.name, account_after.name),
            ),
        };

        self.signals
            .transfer_made(user_id, transfer_id, amount, &detail)
            .await;

        Ok(TransferReceipt {
            transfer_id,
            amount,
            source_balance,
            target_balance,
            message: format!("Transferencia de {} realizada {}.", amount, detail),
        })
    }
}
