//! Group persistence. Membership is owned by the `group_properties` join
//! table; the property side is always computed, never stored.

use crate::models::{Group, GroupWithMembers};
use crate::{Store, StoreResult};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

fn group_from_row(row: &PgRow) -> StoreResult<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        sync_prices: row.try_get("sync_prices")?,
        main_property_id: row.try_get("main_property_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    pub async fn create_group(
        &self,
        owner_id: Uuid,
        name: &str,
        sync_prices: bool,
    ) -> StoreResult<Group> {
        let row = sqlx::query(
            r#"
            INSERT INTO property_groups (id, owner_id, name, sync_prices)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(sync_prices)
        .fetch_one(self.pool())
        .await?;
        group_from_row(&row)
    }

    pub async fn group(&self, id: Uuid) -> StoreResult<Option<GroupWithMembers>> {
        let row = sqlx::query("SELECT * FROM property_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let group = match row.as_ref().map(group_from_row).transpose()? {
            Some(group) => group,
            None => return Ok(None),
        };
        let members = self.group_members(id).await?;
        Ok(Some(GroupWithMembers { group, members }))
    }

    pub async fn group_members(&self, group_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT property_id FROM group_properties WHERE group_id = $1 ORDER BY property_id",
        )
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| Ok(row.try_get("property_id")?))
            .collect()
    }

    /// All groups of an owner, hydrated with members in two queries.
    pub async fn groups_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<GroupWithMembers>> {
        let rows = sqlx::query(
            "SELECT * FROM property_groups WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;
        let groups: Vec<Group> = rows.iter().map(group_from_row).collect::<StoreResult<_>>()?;

        let member_rows = sqlx::query(
            r#"
            SELECT gp.group_id, gp.property_id
            FROM group_properties gp
            JOIN property_groups g ON g.id = gp.group_id
            WHERE g.owner_id = $1
            ORDER BY gp.property_id
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        let mut members_by_group: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in &member_rows {
            let group_id: Uuid = row.try_get("group_id")?;
            let property_id: Uuid = row.try_get("property_id")?;
            members_by_group.entry(group_id).or_default().push(property_id);
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let members = members_by_group.remove(&group.id).unwrap_or_default();
                GroupWithMembers { group, members }
            })
            .collect())
    }

    /// The group a property belongs to, if any (at most one by uniqueness).
    pub async fn group_of_property(&self, property_id: Uuid) -> StoreResult<Option<GroupWithMembers>> {
        let row = sqlx::query(
            r#"
            SELECT g.* FROM property_groups g
            JOIN group_properties gp ON gp.group_id = g.id
            WHERE gp.property_id = $1
            "#,
        )
        .bind(property_id)
        .fetch_optional(self.pool())
        .await?;
        let group = match row.as_ref().map(group_from_row).transpose()? {
            Some(group) => group,
            None => return Ok(None),
        };
        let members = self.group_members(group.id).await?;
        Ok(Some(GroupWithMembers { group, members }))
    }

    /// Add a property to a group. The unique index on `property_id` rejects
    /// double membership.
    pub async fn add_group_member(&self, group_id: Uuid, property_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO group_properties (group_id, property_id) VALUES ($1, $2)")
            .bind(group_id)
            .bind(property_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn remove_group_member(&self, group_id: Uuid, property_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM group_properties WHERE group_id = $1 AND property_id = $2")
            .bind(group_id)
            .bind(property_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_group_main_property(
        &self,
        group_id: Uuid,
        main_property_id: Option<Uuid>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE property_groups
            SET main_property_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .bind(main_property_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_group_sync_prices(&self, group_id: Uuid, sync_prices: bool) -> StoreResult<()> {
        sqlx::query(
            "UPDATE property_groups SET sync_prices = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(group_id)
        .bind(sync_prices)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Delete a group and its join rows atomically.
    pub async fn delete_group(&self, group_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM group_properties WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM property_groups WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
