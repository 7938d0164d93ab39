//! Movement ledger: records movements and reconciles site stock and the
//! product aggregate in one atomic unit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{generate_reference, Movement, MovementKind, MovementPlan, Site, StockHealth};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, MovementFilter};

const DEFAULT_HISTORY_LIMIT: i64 = 200;
const MAX_HISTORY_LIMIT: i64 = 1000;

/// Produces a reference for a movement of the given kind and date
pub type ReferenceGenerator = Arc<dyn Fn(MovementKind, NaiveDate) -> String + Send + Sync>;

/// Ledger service for recording and reading movements
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn InventoryStore>,
    reference_attempts: u32,
    reference_generator: ReferenceGenerator,
}

/// Input for recording a movement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    /// Business date of the movement, today when omitted
    pub movement_date: Option<NaiveDate>,
    pub origin_site_id: Option<Uuid>,
    pub destination_site_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
    /// Caller-chosen reference; generated when omitted
    #[validate(length(min = 1, max = 64, message = "Reference must be 1 to 64 characters"))]
    pub reference: Option<String>,
}

impl RecordMovementInput {
    pub fn new(product_id: Uuid, kind: MovementKind, quantity: i32) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            movement_date: None,
            origin_site_id: None,
            destination_site_id: None,
            reason: None,
            reference: None,
        }
    }

    pub fn from_site(mut self, site_id: Uuid) -> Self {
        self.origin_site_id = Some(site_id);
        self
    }

    pub fn to_site(mut self, site_id: Uuid) -> Self {
        self.destination_site_id = Some(site_id);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A committed movement with the aggregate it produced
#[derive(Debug, Clone, serde::Serialize)]
pub struct MovementReceipt {
    pub movement: Movement,
    pub global_stock: i64,
    /// Change this movement made to the aggregate
    pub stock_change: i64,
    pub health: StockHealth,
}

/// Fields shared by every attempt at the same movement
struct MovementDraft<'a> {
    product_id: Uuid,
    min_stock: i32,
    plan: MovementPlan,
    movement_date: Option<NaiveDate>,
    reason: Option<String>,
    reference: Option<String>,
    actor_id: Option<Uuid>,
    sites: &'a HashMap<Uuid, Site>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn InventoryStore>, reference_attempts: u32) -> Self {
        Self {
            store,
            reference_attempts: reference_attempts.max(1),
            reference_generator: Arc::new(generate_reference),
        }
    }

    /// Replace how references are generated when the caller supplies none
    pub fn with_reference_generator(
        mut self,
        generator: impl Fn(MovementKind, NaiveDate) -> String + Send + Sync + 'static,
    ) -> Self {
        self.reference_generator = Arc::new(generator);
        self
    }

    /// Record a movement and reconcile stock.
    ///
    /// Every step runs inside one store transaction; on any error nothing is
    /// written. A generated reference that collides is regenerated and the
    /// whole movement retried.
    #[tracing::instrument(
        skip(self, input),
        fields(product_id = %input.product_id, kind = input.kind.as_str(), quantity = input.quantity)
    )]
    pub async fn record_movement(
        &self,
        input: RecordMovementInput,
        actor_id: Option<Uuid>,
    ) -> AppResult<MovementReceipt> {
        input.validate()?;

        let plan = MovementPlan::new(
            input.kind,
            input.quantity,
            input.origin_site_id,
            input.destination_site_id,
        )
        .map_err(|violation| {
            tracing::warn!(%violation, "Movement rejected");
            AppError::from(violation)
        })?;

        let product = self
            .store
            .get_product(input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", input.product_id))?;

        let mut sites = HashMap::new();
        for site_id in plan.touched_sites().into_iter().chain(plan.recorded_destination()) {
            if sites.contains_key(&site_id) {
                continue;
            }
            let site = self
                .store
                .get_site(site_id)
                .await?
                .ok_or_else(|| AppError::not_found("Site", site_id))?;
            sites.insert(site_id, site);
        }

        let reference = match input.reference {
            Some(reference) if reference.trim().is_empty() => {
                return Err(AppError::Validation {
                    field: "reference".to_string(),
                    message: "Reference cannot be blank".to_string(),
                })
            }
            Some(reference) => Some(reference.trim().to_string()),
            None => None,
        };
        let attempts = if reference.is_some() {
            1
        } else {
            self.reference_attempts
        };

        let draft = MovementDraft {
            product_id: product.id,
            min_stock: product.min_stock,
            plan,
            movement_date: input.movement_date,
            reason: input
                .reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
            reference,
            actor_id,
            sites: &sites,
        };

        let mut attempt = 1;
        loop {
            match self.apply(&draft).await {
                Ok(receipt) => {
                    tracing::info!(
                        reference = %receipt.movement.reference,
                        global_stock = receipt.global_stock,
                        stock_change = receipt.stock_change,
                        health = %receipt.health,
                        "Movement recorded"
                    );
                    return Ok(receipt);
                }
                Err(AppError::DuplicateReference(reference)) if attempt < attempts => {
                    tracing::warn!(%reference, attempt, "Generated reference collided, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_insufficient_stock() {
                        tracing::warn!(error = %err, "Movement rejected");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One attempt at the reconciliation. Returning early drops the
    /// transaction, which discards all of its writes.
    async fn apply(&self, draft: &MovementDraft<'_>) -> AppResult<MovementReceipt> {
        let plan = &draft.plan;
        let quantity = plan.quantity();

        let mut tx = self
            .store
            .begin_movement(draft.product_id, &plan.touched_sites())
            .await?;

        // Debit before credit so a failed transfer never credits
        if let Some(origin) = plan.debit_site() {
            let site = site_name(draft.sites, origin);
            match tx.site_stock_for_update(origin).await? {
                None => return Err(AppError::NoStockOnRecord { site }),
                Some(available) if available < quantity => {
                    return Err(AppError::InsufficientStock {
                        site,
                        available,
                        requested: quantity,
                    })
                }
                Some(_) => {
                    tx.debit(origin, quantity).await?;
                }
            }
        }

        if let Some(destination) = plan.credit_site() {
            tx.credit(destination, quantity).await?;
        }

        let created_at = Utc::now();
        let reference = match &draft.reference {
            Some(reference) => reference.clone(),
            None => (self.reference_generator)(plan.kind(), created_at.date_naive()),
        };

        let global_stock = tx.recompute_global_stock().await?;

        let movement = Movement {
            id: Uuid::new_v4(),
            product_id: draft.product_id,
            kind: plan.kind(),
            quantity,
            movement_date: draft.movement_date.unwrap_or_else(|| created_at.date_naive()),
            origin_site_id: plan.debit_site(),
            destination_site_id: plan.recorded_destination(),
            reason: draft.reason.clone(),
            actor_id: draft.actor_id,
            reference,
            created_at,
        };

        tx.insert_movement(&movement).await?;
        tx.commit().await?;

        Ok(MovementReceipt {
            movement,
            global_stock,
            stock_change: plan.net_change(),
            health: StockHealth::classify(global_stock, draft.min_stock),
        })
    }

    /// Get a movement by ID
    pub async fn get_movement(&self, id: Uuid) -> AppResult<Movement> {
        self.store
            .get_movement(id)
            .await?
            .ok_or_else(|| AppError::not_found("Movement", id))
    }

    /// Movement history, newest first
    pub async fn list_movements(&self, mut filter: MovementFilter) -> AppResult<Vec<Movement>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::Validation {
                    field: "from".to_string(),
                    message: "Start date must not be after end date".to_string(),
                });
            }
        }

        filter.limit = Some(
            filter
                .limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT),
        );

        self.store.list_movements(&filter).await
    }
}

fn site_name(sites: &HashMap<Uuid, Site>, site_id: Uuid) -> String {
    sites
        .get(&site_id)
        .map(|site| site.name.clone())
        .unwrap_or_else(|| site_id.to_string())
}
