use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;

use common::{Error, Result, ScriptParam};
use strategy::script::parse_params;

use crate::{SavedScript, SavedStrategy, StrategySnapshot, StrategySummary};

/// Saved strategies and scripts, backed by SQLite.
#[derive(Clone)]
pub struct Library {
    db: SqlitePool,
}

impl Library {
    /// Open (creating if needed) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = SqlitePool::connect(url).await?;
        Self::with_pool(db).await
    }

    /// Private in-memory library. A single pinned connection keeps the
    /// database alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(db).await
    }

    pub async fn with_pool(db: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations")
            .run(&db)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self { db })
    }

    // ─── Strategies ──────────────────────────────────────────────────────────

    pub async fn save_strategy(&self, name: &str, snapshot: &StrategySnapshot) -> Result<SavedStrategy> {
        let saved = SavedStrategy {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            snapshot: snapshot.clone(),
            saved_at: Utc::now(),
        };
        let document = serde_json::to_string(&saved.snapshot)?;

        sqlx::query("INSERT INTO strategies (id, name, document, saved_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&saved.id)
            .bind(&saved.name)
            .bind(&document)
            .bind(saved.saved_at.to_rfc3339())
            .execute(&self.db)
            .await?;

        info!(id = %saved.id, name = %saved.name, nodes = saved.snapshot.nodes.len(), "Saved strategy");
        Ok(saved)
    }

    /// All saved strategies, oldest first.
    pub async fn list_strategies(&self) -> Result<Vec<StrategySummary>> {
        let rows = sqlx::query("SELECT id, name, saved_at FROM strategies ORDER BY saved_at ASC, rowid ASC")
            .fetch_all(&self.db)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(StrategySummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    saved_at: timestamp(row)?,
                })
            })
            .collect()
    }

    pub async fn load_strategy(&self, id: &str) -> Result<SavedStrategy> {
        let row = sqlx::query("SELECT id, name, document, saved_at FROM strategies WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("strategy", id))?;

        let document: String = row.try_get("document")?;
        Ok(SavedStrategy {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            snapshot: serde_json::from_str(&document)?,
            saved_at: timestamp(&row)?,
        })
    }

    pub async fn delete_strategy(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM strategies WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("strategy", id));
        }
        info!(id, "Deleted strategy");
        Ok(())
    }

    // ─── Scripts ─────────────────────────────────────────────────────────────

    /// Save a script under `name`. An existing script with the same name is
    /// overwritten and keeps its id, so graph nodes referring to it stay valid.
    pub async fn save_script(&self, name: &str, code: &str) -> Result<SavedScript> {
        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM scripts WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        let script = SavedScript {
            id: existing.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: name.to_string(),
            code: code.to_string(),
            params: parse_params(code),
            saved_at: Utc::now(),
        };
        let params = serde_json::to_string(&script.params)?;

        sqlx::query(
            r#"
            INSERT INTO scripts (id, name, code, params, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                params = excluded.params,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&script.id)
        .bind(&script.name)
        .bind(&script.code)
        .bind(&params)
        .bind(script.saved_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        info!(id = %script.id, name = %script.name, params = script.params.len(), "Saved script");
        Ok(script)
    }

    /// Replace the code of an existing script, re-deriving its parameters.
    pub async fn update_script(&self, id: &str, code: &str) -> Result<SavedScript> {
        let mut script = self.get_script(id).await?;
        script.code = code.to_string();
        script.params = parse_params(code);
        script.saved_at = Utc::now();

        sqlx::query("UPDATE scripts SET code = ?1, params = ?2, saved_at = ?3 WHERE id = ?4")
            .bind(&script.code)
            .bind(serde_json::to_string(&script.params)?)
            .bind(script.saved_at.to_rfc3339())
            .bind(id)
            .execute(&self.db)
            .await?;

        info!(id, params = script.params.len(), "Updated script");
        Ok(script)
    }

    pub async fn rename_script(&self, id: &str, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE scripts SET name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("script", id));
        }
        info!(id, name, "Renamed script");
        Ok(())
    }

    pub async fn delete_script(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM scripts WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("script", id));
        }
        info!(id, "Deleted script");
        Ok(())
    }

    pub async fn get_script(&self, id: &str) -> Result<SavedScript> {
        let row = sqlx::query("SELECT id, name, code, params, saved_at FROM scripts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("script", id))?;
        script_from_row(&row)
    }

    /// All saved scripts ordered by name.
    pub async fn list_scripts(&self) -> Result<Vec<SavedScript>> {
        let rows = sqlx::query("SELECT id, name, code, params, saved_at FROM scripts ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(script_from_row).collect()
    }
}

fn script_from_row(row: &SqliteRow) -> Result<SavedScript> {
    let params: String = row.try_get("params")?;
    let params: Vec<ScriptParam> = serde_json::from_str(&params)?;
    Ok(SavedScript {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        params,
        saved_at: timestamp(row)?,
    })
}

fn timestamp(row: &SqliteRow) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get("saved_at")?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("invalid timestamp '{raw}': {e}")))
}

fn not_found(kind: &'static str, id: &str) -> Error {
    Error::NotFound {
        kind,
        id: id.to_string(),
    }
}
