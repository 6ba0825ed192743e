// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User suspension state.
//!
//! Users themselves live in the identity service; this table only records
//! the last suspend/reactivate decision per user. No row means active.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{decode, encode, DbResult, Snapshot, UnitOfWork, SUSPENDED_USERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusRecord {
    pub user_id: String,
    pub status: UserStatus,
    pub reason: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

fn load_status<R>(table: &R, user_id: &str) -> DbResult<Option<UserStatusRecord>>
where
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(user_id)? {
        Some(value) => Ok(Some(decode(value.value())?)),
        None => Ok(None),
    }
}

pub struct UserStore<'u> {
    unit: &'u UnitOfWork,
}

impl<'u> UserStore<'u> {
    pub fn new(unit: &'u UnitOfWork) -> Self {
        Self { unit }
    }

    pub fn status(&self, user_id: &str) -> DbResult<UserStatus> {
        let table = self.unit.txn().open_table(SUSPENDED_USERS)?;
        Ok(load_status(&table, user_id)?
            .map(|r| r.status)
            .unwrap_or(UserStatus::Active))
    }

    pub fn set_status(
        &self,
        user_id: &str,
        status: UserStatus,
        reason: Option<String>,
        changed_by: &str,
    ) -> DbResult<UserStatusRecord> {
        let record = UserStatusRecord {
            user_id: user_id.to_string(),
            status,
            reason,
            changed_by: changed_by.to_string(),
            changed_at: Utc::now(),
        };
        let bytes = encode(&record)?;
        self.unit
            .txn()
            .open_table(SUSPENDED_USERS)?
            .insert(user_id, bytes.as_slice())?;
        Ok(record)
    }
}

impl Snapshot {
    pub fn user_status(&self, user_id: &str) -> DbResult<Option<UserStatusRecord>> {
        let table = self.txn().open_table(SUSPENDED_USERS)?;
        load_status(&table, user_id)
    }
}
