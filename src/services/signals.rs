//! services/signals.rs
//! Reacciones que se disparan después de confirmar una escritura y terminan
//! en notificaciones. Nunca hacen fallar la operación que las originó.

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use crate::{
    models::{
        money::{format_currency, normalize},
        notification_model::{NotificationOptions, Priority},
        savings_model::{Contribution, SavingsGoal},
        transaction_model::{Transaction, TransactionKind},
    },
    services::{notification_service::NotificationService, signal_lock::SignalLock},
};

/// Minutos hacia atrás en los que se buscan notificaciones repetidas.
const DEDUP_WINDOW_MINUTES: i64 = 5;

/// Datos de la cuenta tras un cambio de saldo.
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub account_id: i64,
    pub user_id: i64,
    pub account_name: String,
    pub balance: Decimal,
}

#[derive(Clone)]
pub struct FinanceSignals {
    notifications: NotificationService,
    lock: SignalLock,
    lock_ttl: Duration,
    low_balance_threshold: Decimal,
}

fn amount_key(amount: Decimal) -> String {
    normalize(amount).to_string()
}

/// alta desde 1000, media desde 500, baja el resto.
pub fn transaction_priority(amount: Decimal) -> Priority {
    if amount >= Decimal::from(1000) {
        Priority::Alta
    } else if amount >= Decimal::from(500) {
        Priority::Media
    } else {
        Priority::Baja
    }
}

/// (tipo, título, prioridad) para el estado de una cuenta; `None` si está sana.
pub fn balance_alert(balance: Decimal, threshold: Decimal) -> Option<(&'static str, &'static str, Priority)> {
    if balance < Decimal::ZERO {
        Some(("negative_balance", "🚨 Saldo negativo", Priority::Urgente))
    } else if balance < threshold {
        Some(("low_balance", "⚠️ Saldo bajo en cuenta", Priority::Alta))
    } else {
        None
    }
}

/// (título, prioridad) según los días que faltan para la fecha límite.
pub fn due_soon_urgency(days_left: i64) -> (String, Priority) {
    if days_left <= 1 {
        ("⏰ Meta por vencer hoy".to_string(), Priority::Urgente)
    } else if days_left <= 3 {
        (format!("⏰ Meta por vencer en {} días", days_left), Priority::Alta)
    } else {
        (format!("📅 Meta por vencer en {} días", days_left), Priority::Media)
    }
}

impl FinanceSignals {
    pub fn new(
        notifications: NotificationService,
        lock: SignalLock,
        lock_ttl: Duration,
        low_balance_threshold: Decimal,
    ) -> Self {
        Self {
            notifications,
            lock,
            lock_ttl,
            low_balance_threshold,
        }
    }

    pub async fn transaction_created(&self, tx: &Transaction, account_balance: Decimal) {
        let Some(_guard) = self.lock.guard(
            "transaction_recorded",
            "Transaction",
            tx.id,
            Some(tx.user_id),
            self.lock_ttl,
        ) else {
            return;
        };

        log::info!("Ejecutando signal transaction_recorded para Transaction:{}", tx.id);
        if let Err(e) = self.notify_transaction(tx, account_balance).await {
            log::error!("Error en notificación de movimiento {}: {:?}", tx.id, e);
        }
    }

    async fn notify_transaction(&self, tx: &Transaction, account_balance: Decimal) -> Result<()> {
        let since = NotificationService::dedup_since(DEDUP_WINDOW_MINUTES);
        let types = ["transaction_recorded"];

        if self
            .notifications
            .exists_recent(tx.user_id, &types, &[("transaction_id", json!(tx.id))], since)
            .await?
        {
            log::warn!("Ya existe notificación para movimiento ID {}, saltando...", tx.id);
            return Ok(());
        }

        let by_content = [
            ("amount", json!(amount_key(tx.amount))),
            ("transaction_kind", json!(tx.kind.as_str())),
            ("account_id", json!(tx.account_id)),
        ];
        if self
            .notifications
            .exists_recent(tx.user_id, &types, &by_content, since)
            .await?
        {
            log::warn!("Ya existe notificación similar para este tipo de movimiento, saltando...");
            return Ok(());
        }

        let recipient = self.notifications.recipient(tx.user_id).await?;
        let symbol = recipient.currency_symbol.as_str();
        let amount = format_currency(tx.amount, symbol);

        let title = match tx.kind {
            TransactionKind::Income => "💵 Nuevo ingreso registrado",
            TransactionKind::Expense => "💸 Nuevo gasto registrado",
        };

        let mut message = format!("Hola {},\n\n", recipient.first_name);
        message.push_str(&format!(
            "Se ha registrado un {} con los siguientes detalles:\n\n",
            tx.kind.display()
        ));
        message.push_str(&format!("🏷️ **{}**\n", tx.name));
        message.push_str(&format!("💰 Monto: {}\n", amount));
        message.push_str(&format!("🏦 Cuenta: {}\n", tx.account_name));
        if let Some(description) = tx.description.as_deref().filter(|d| !d.is_empty()) {
            message.push_str(&format!("📝 Descripción: {}\n", description));
        }
        message.push_str(&format!(
            "\n💳 Saldo actual de la cuenta: {}",
            format_currency(account_balance, symbol)
        ));

        match tx.kind {
            TransactionKind::Income => message.push_str(&format!(
                "\n\n¡Excelente! Tus ingresos suman {} más a tu patrimonio. 🎉",
                amount
            )),
            TransactionKind::Expense if tx.amount >= Decimal::from(1000) => message.push_str(
                "\n\n⚠️ Este es un gasto considerable. Recuerda revisar tu presupuesto mensual.",
            ),
            TransactionKind::Expense if tx.amount >= Decimal::from(500) => {
                message.push_str("\n\n💡 Gasto registrado. Mantén el control de tus finanzas.")
            }
            TransactionKind::Expense => message
                .push_str("\n\n✅ Gasto registrado correctamente en tu historial financiero."),
        }

        let opts = NotificationOptions {
            priority: transaction_priority(tx.amount),
            extra_data: Some(json!({
                "transaction_id": tx.id,
                "transaction_kind": tx.kind.as_str(),
                "transaction_name": tx.name,
                "amount": amount_key(tx.amount),
                "account_id": tx.account_id,
                "account_name": tx.account_name,
                "current_balance": amount_key(account_balance),
                "occurred_at": tx.occurred_at,
                "description": tx.description.clone().unwrap_or_default(),
            })),
            source_module: Some("transactions".to_string()),
            related_object: Some(format!("transaction:{}", tx.id)),
            ..Default::default()
        };

        self.notifications
            .create_notification(tx.user_id, "transaction_recorded", title, &message, "Transacciones", opts)
            .await?;
        Ok(())
    }

    /// `goal` es el estado de la meta después del aporte.
    pub async fn contribution_created(&self, contribution: &Contribution, goal: &SavingsGoal) {
        let Some(_guard) = self.lock.guard(
            "contribution_made",
            "Contribution",
            contribution.id,
            Some(contribution.user_id),
            self.lock_ttl,
        ) else {
            return;
        };

        if let Err(e) = self.notify_contribution(contribution, goal).await {
            log::error!("Error en notificación de aporte {}: {:?}", contribution.id, e);
        }
    }

    async fn notify_contribution(&self, contribution: &Contribution, goal: &SavingsGoal) -> Result<()> {
        let since = NotificationService::dedup_since(DEDUP_WINDOW_MINUTES);
        let duplicated = self
            .notifications
            .exists_recent(
                contribution.user_id,
                &["contribution_made", "goal_progress", "goal_reached"],
                &[
                    ("goal_id", json!(goal.id)),
                    ("contribution_amount", json!(amount_key(contribution.amount))),
                ],
                since,
            )
            .await?;
        if duplicated {
            log::warn!("Ya existe notificación para este aporte, saltando...");
            return Ok(());
        }

        let recipient = self.notifications.recipient(contribution.user_id).await?;
        let symbol = recipient.currency_symbol.as_str();

        let mut title = "💰 Nuevo aporte registrado";
        let mut message = format!(
            "Has registrado un aporte de {} a tu meta '{}'. ",
            format_currency(contribution.amount, symbol),
            goal.name
        );

        let type_name = if goal.reached {
            title = "🎉 ¡Meta alcanzada!";
            message.push_str(&format!(
                "¡Felicidades! Has alcanzado tu meta de {}. ¡Excelente trabajo!",
                format_currency(goal.target_amount, symbol)
            ));
            "goal_reached"
        } else if goal.progress >= 90.0 {
            title = "🎯 ¡Casi lo logras!";
            message.push_str(&format!(
                "Ya tienes {:.1}% de tu meta. Solo te faltan {}.",
                goal.progress,
                format_currency(goal.remaining, symbol)
            ));
            "goal_progress"
        } else if goal.progress >= 75.0 {
            message.push_str(&format!("Vas muy bien, ya tienes {:.1}% de tu meta.", goal.progress));
            "goal_progress"
        } else {
            message.push_str(&format!("Progreso actual: {:.1}% de tu meta.", goal.progress));
            "contribution_made"
        };

        let category = if goal.reached { "Logros" } else { "Metas" };
        let opts = NotificationOptions {
            priority: if goal.reached { Priority::Alta } else { Priority::Media },
            extra_data: Some(json!({
                "goal_id": goal.id,
                "goal_name": goal.name,
                "contribution_amount": amount_key(contribution.amount),
                "progress": goal.progress,
                "target_amount": amount_key(goal.target_amount),
                "saved_amount": amount_key(goal.saved),
            })),
            source_module: Some("savings".to_string()),
            related_object: Some(format!("goal:{}", goal.id)),
            ..Default::default()
        };

        self.notifications
            .create_notification(contribution.user_id, type_name, title, &message, category, opts)
            .await?;
        Ok(())
    }

    pub async fn goal_created(&self, goal: &SavingsGoal) {
        let Some(_guard) =
            self.lock
                .guard("new_goal", "SavingsGoal", goal.id, Some(goal.user_id), self.lock_ttl)
        else {
            return;
        };

        if let Err(e) = self.notify_new_goal(goal).await {
            log::error!("Error en notificación de nueva meta {}: {:?}", goal.id, e);
        }
    }

    async fn notify_new_goal(&self, goal: &SavingsGoal) -> Result<()> {
        let since = NotificationService::dedup_since(DEDUP_WINDOW_MINUTES);
        if self
            .notifications
            .exists_recent(goal.user_id, &["new_goal"], &[("goal_id", json!(goal.id))], since)
            .await?
        {
            log::warn!("Ya existe notificación para esta nueva meta, saltando...");
            return Ok(());
        }

        let recipient = self.notifications.recipient(goal.user_id).await?;
        let message = format!(
            "Has creado la meta '{}' con un objetivo de {}. Fecha límite: {}. ¡Comienza a ahorrar!",
            goal.name,
            format_currency(goal.target_amount, &recipient.currency_symbol),
            goal.deadline.format("%d/%m/%Y")
        );

        let opts = NotificationOptions {
            priority: Priority::Media,
            extra_data: Some(json!({
                "goal_id": goal.id,
                "goal_name": goal.name,
                "target_amount": amount_key(goal.target_amount),
                "deadline": goal.deadline.to_string(),
                "frequency": goal.frequency,
            })),
            source_module: Some("savings".to_string()),
            related_object: Some(format!("goal:{}", goal.id)),
            ..Default::default()
        };

        self.notifications
            .create_notification(
                goal.user_id,
                "new_goal",
                "🎯 Nueva meta de ahorro creada",
                &message,
                "Metas",
                opts,
            )
            .await?;
        Ok(())
    }

    /// Primero saldo negativo, luego saldo bajo.
    pub async fn account_balance_changed(&self, change: &BalanceChange) {
        if let Err(e) = self.notify_balance(change).await {
            log::error!("Error en alerta de saldo para cuenta {}: {:?}", change.account_id, e);
        }
    }

    async fn notify_balance(&self, change: &BalanceChange) -> Result<()> {
        let Some((type_name, title, priority)) = balance_alert(change.balance, self.low_balance_threshold)
        else {
            return Ok(());
        };

        let recipient = self.notifications.recipient(change.user_id).await?;
        let balance = format_currency(change.balance, &recipient.currency_symbol);
        let message = if type_name == "negative_balance" {
            format!(
                "¡Atención! Tu cuenta '{}' tiene saldo negativo: {}. Es recomendable hacer un depósito lo antes posible.",
                change.account_name, balance
            )
        } else {
            format!(
                "Tu cuenta '{}' tiene un saldo bajo: {}. Considera revisar tus gastos o hacer un depósito.",
                change.account_name, balance
            )
        };

        let opts = NotificationOptions {
            priority,
            extra_data: Some(json!({
                "account_id": change.account_id,
                "account_name": change.account_name,
                "current_balance": amount_key(change.balance),
                "threshold": amount_key(self.low_balance_threshold),
            })),
            source_module: Some("accounts".to_string()),
            related_object: Some(format!("account:{}", change.account_id)),
            ..Default::default()
        };

        self.notifications
            .create_notification(change.user_id, type_name, title, &message, "Saldo", opts)
            .await?;
        Ok(())
    }

    pub async fn transfer_made(&self, user_id: i64, transfer_id: i64, amount: Decimal, detail: &str) {
        let Some(_guard) =
            self.lock
                .guard("transfer_made", "Transfer", transfer_id, Some(user_id), self.lock_ttl)
        else {
            return;
        };

        let result = async {
            let recipient = self.notifications.recipient(user_id).await?;
            let message = format!(
                "Transferiste {} {}.",
                format_currency(amount, &recipient.currency_symbol),
                detail
            );
            let opts = NotificationOptions {
                priority: Priority::Baja,
                extra_data: Some(json!({
                    "transfer_id": transfer_id,
                    "amount": amount_key(amount),
                })),
                source_module: Some("accounts".to_string()),
                ..Default::default()
            };
            self.notifications
                .create_notification(
                    user_id,
                    "transfer_made",
                    "🔄 Transferencia realizada",
                    &message,
                    "Transferencias",
                    opts,
                )
                .await
        }
        .await;

        if let Err(e) = result {
            log::error!("Error en notificación de transferencia {}: {:?}", transfer_id, e);
        }
    }

    /// Aviso de meta próxima a vencer; `today` se inyecta para poder probarlo.
    pub async fn goal_due_soon(&self, goal: &SavingsGoal, today: NaiveDate) -> Result<bool> {
        let days_left = (goal.deadline - today).num_days();
        let (title, priority) = due_soon_urgency(days_left);

        // Un aviso por meta y día restante
        let already = self
            .notifications
            .exists_recent(
                goal.user_id,
                &["goal_due_soon"],
                &[("goal_id", json!(goal.id)), ("days_left", json!(days_left))],
                NotificationService::dedup_since(24 * 60),
            )
            .await?;
        if already {
            return Ok(false);
        }

        let recipient = self.notifications.recipient(goal.user_id).await?;
        let mut message = format!(
            "Tu meta '{}' vence el {}. Progreso actual: {:.1}%. ",
            goal.name,
            goal.deadline.format("%d/%m/%Y"),
            goal.progress
        );
        if goal.progress < 90.0 {
            message.push_str(&format!(
                "Te faltan {} para alcanzarla.",
                format_currency(goal.remaining, &recipient.currency_symbol)
            ));
        } else {
            message.push_str("¡Estás muy cerca de lograrla!");
        }

        let opts = NotificationOptions {
            priority,
            extra_data: Some(json!({
                "goal_id": goal.id,
                "goal_name": goal.name,
                "days_left": days_left,
                "progress": goal.progress,
                "missing_amount": amount_key(goal.remaining),
            })),
            source_module: Some("savings".to_string()),
            related_object: Some(format!("goal:{}", goal.id)),
            ..Default::default()
        };

        let created = self
            .notifications
            .create_notification(goal.user_id, "goal_due_soon", &title, &message, "Metas", opts)
            .await?;
        Ok(created.is_some())
    }
}
