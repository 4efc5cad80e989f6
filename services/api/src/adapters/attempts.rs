//! services/api/src/adapters/attempts.rs
//!
//! Implementations of the `AttemptCounter` port used to cap interview starts.
//!
//! Both counters are keyed by (subject, calendar day) and discard past days, so a
//! long-running process never accumulates more than one entry per active subject.

use academy_core::domain::AttemptDecision;
use academy_core::ports::{AttemptCounter, PortError, PortResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;

//=========================================================================================
// Process-local counter
//=========================================================================================

/// Counter held in process memory. Not shared between instances.
#[derive(Default)]
pub struct InMemoryAttemptCounter {
    counts: Mutex<HashMap<String, (NaiveDate, u32)>>,
}

impl InMemoryAttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subjects currently tracked.
    pub async fn tracked_subjects(&self) -> usize {
        self.counts.lock().await.len()
    }
}

#[async_trait]
impl AttemptCounter for InMemoryAttemptCounter {
    async fn try_record(
        &self,
        subject: &str,
        day: NaiveDate,
        limit: u32,
    ) -> PortResult<AttemptDecision> {
        let mut counts = self.counts.lock().await;
        counts.retain(|_, (counted_day, _)| *counted_day >= day);

        let entry = counts.entry(subject.to_string()).or_insert((day, 0));
        if entry.0 != day {
            *entry = (day, 0);
        }
        if entry.1 >= limit {
            return Ok(AttemptDecision::Rejected { used: entry.1 });
        }
        entry.1 += 1;
        Ok(AttemptDecision::Allowed { used: entry.1 })
    }
}

//=========================================================================================
// Shared PostgreSQL counter
//=========================================================================================

/// Counter stored in the `interview_attempts` table, shared by every instance.
#[derive(Clone)]
pub struct PgAttemptCounter {
    pool: PgPool,
}

impl PgAttemptCounter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptCounter for PgAttemptCounter {
    async fn try_record(
        &self,
        subject: &str,
        day: NaiveDate,
        limit: u32,
    ) -> PortResult<AttemptDecision> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        sqlx::query("DELETE FROM interview_attempts WHERE day < $1")
            .bind(day)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // No row comes back when the conflict branch's WHERE fails: the cap is reached.
        let counted: Option<i32> = sqlx::query_scalar(
            "INSERT INTO interview_attempts (subject, day, count) VALUES ($1, $2, 1) \
             ON CONFLICT (subject, day) DO UPDATE SET count = interview_attempts.count + 1 \
             WHERE interview_attempts.count < $3 \
             RETURNING count",
        )
        .bind(subject)
        .bind(day)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match counted {
            Some(used) => Ok(AttemptDecision::Allowed { used: used as u32 }),
            None => Ok(AttemptDecision::Rejected { used: limit as u32 }),
        }
    }
}
