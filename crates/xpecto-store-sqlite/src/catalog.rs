//! Catalog documents, one table keyed by `(kind, entity_id)`.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use xpecto_core::{
  catalog::{Entity, Record},
  store::Repository,
};

use crate::{
  Result, SqliteStore,
  encode::{RawRecord, encode_dt, encode_uuid},
};

impl<E: Entity> Repository<E> for SqliteStore {
  type Error = crate::Error;

  async fn create(&self, data: E) -> Result<Record<E>> {
    let now = Utc::now();
    let id = Uuid::new_v4();

    let id_str = encode_uuid(id);
    let body = serde_json::to_string(&data)?;
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO catalog (kind, entity_id, body_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![E::KIND, id_str, body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(Record { id, data, created_at: now, updated_at: now })
  }

  async fn list(&self) -> Result<Vec<Record<E>>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_id, body_json, created_at, updated_at
           FROM catalog
           WHERE kind = ?1
           ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![E::KIND], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn get(&self, id: Uuid) -> Result<Option<Record<E>>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT entity_id, body_json, created_at, updated_at
               FROM catalog
               WHERE kind = ?1 AND entity_id = ?2",
              rusqlite::params![E::KIND, id_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn update(&self, id: Uuid, data: E) -> Result<Option<Record<E>>> {
    let id_str = encode_uuid(id);
    let body = serde_json::to_string(&data)?;
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE catalog SET body_json = ?3, updated_at = ?4
           WHERE kind = ?1 AND entity_id = ?2",
          rusqlite::params![E::KIND, id_str, body, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    <Self as Repository<E>>::get(self, id).await
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM catalog WHERE kind = ?1 AND entity_id = ?2",
          rusqlite::params![E::KIND, id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}
