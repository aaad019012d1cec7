//! `PostgreSQL` implementation of the storage ports.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph::{Choice, Node, NodeWithChoices, Position};
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::story::{DraftState, Metadata, Story, StoryDetails, StoryStatus};
use storyforge_core::version::StoryVersion;

const STORY_COLUMNS: &str = "id, title, description, cover_image, genres, difficulty, status, \
     draft_version, current_version, published_at, metadata, revision, created_at, updated_at";

const NODE_COLUMNS: &str =
    "id, story_id, title, content, is_start, is_ending, position_x, position_y, metadata";

const CHOICE_COLUMNS: &str =
    "id, story_id, source_node_id, target_node_id, text, sort_order, conditions";

const VERSION_COLUMNS: &str =
    "id, story_id, version_number, snapshot, snapshot_hash, published_at, notes";

/// PostgreSQL-backed story store.
#[derive(Debug, Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    /// Creates a new `PgStoryStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns the migrator error if a migration fails to apply.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn persistence(err: sqlx::Error) -> DomainError {
    DomainError::Persistence(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn story_from_row(row: &PgRow) -> Result<Story, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = StoryStatus::parse(&status).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "status".to_owned(),
        source: format!("unknown story status {status}").into(),
    })?;
    let draft_state = match row.try_get::<Option<i32>, _>("draft_version")? {
        Some(draft_version) => DraftState::EditingVersion { draft_version },
        None => DraftState::Fresh,
    };
    let Json(metadata): Json<Metadata> = row.try_get("metadata")?;
    Ok(Story {
        id: row.try_get("id")?,
        details: StoryDetails {
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            cover_image: row.try_get("cover_image")?,
            genres: row.try_get("genres")?,
            difficulty: row.try_get("difficulty")?,
        },
        status,
        draft_state,
        current_version: row.try_get("current_version")?,
        published_at: row.try_get("published_at")?,
        metadata,
        revision: row.try_get("revision")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn node_from_row(row: &PgRow) -> Result<Node, sqlx::Error> {
    let Json(metadata): Json<Metadata> = row.try_get("metadata")?;
    Ok(Node {
        id: row.try_get("id")?,
        story_id: row.try_get("story_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        is_start: row.try_get("is_start")?,
        is_ending: row.try_get("is_ending")?,
        position: Position {
            x: row.try_get("position_x")?,
            y: row.try_get("position_y")?,
        },
        metadata,
    })
}

fn choice_from_row(row: &PgRow) -> Result<Choice, sqlx::Error> {
    let Json(conditions): Json<serde_json::Value> = row.try_get("conditions")?;
    Ok(Choice {
        id: row.try_get("id")?,
        story_id: row.try_get("story_id")?,
        source_node_id: row.try_get("source_node_id")?,
        target_node_id: row.try_get("target_node_id")?,
        text: row.try_get("text")?,
        order: row.try_get("sort_order")?,
        conditions,
    })
}

fn version_from_row(row: &PgRow) -> Result<StoryVersion, sqlx::Error> {
    Ok(StoryVersion {
        id: row.try_get("id")?,
        story_id: row.try_get("story_id")?,
        version_number: row.try_get("version_number")?,
        snapshot_json: row.try_get("snapshot")?,
        snapshot_hash: row.try_get("snapshot_hash")?,
        published_at: row.try_get("published_at")?,
        notes: row.try_get("notes")?,
    })
}

/// Writes `story` if the stored revision matches, inside the caller's
/// connection or transaction.
async fn write_story(
    conn: &mut PgConnection,
    story: &Story,
    expected_revision: i64,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        "UPDATE stories SET title = $2, description = $3, cover_image = $4, genres = $5, \
         difficulty = $6, status = $7, draft_version = $8, current_version = $9, \
         published_at = $10, metadata = $11, revision = $12, updated_at = $13 \
         WHERE id = $1 AND revision = $14",
    )
    .bind(story.id)
    .bind(&story.details.title)
    .bind(&story.details.description)
    .bind(&story.details.cover_image)
    .bind(&story.details.genres)
    .bind(&story.details.difficulty)
    .bind(story.status.as_str())
    .bind(story.draft_state.draft_version())
    .bind(story.current_version)
    .bind(story.published_at)
    .bind(Json(&story.metadata))
    .bind(story.revision)
    .bind(story.updated_at)
    .bind(expected_revision)
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let actual: Option<i64> = sqlx::query_scalar("SELECT revision FROM stories WHERE id = $1")
        .bind(story.id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(persistence)?;
    match actual {
        Some(actual) => Err(DomainError::ConcurrencyConflict {
            story_id: story.id,
            expected: expected_revision,
            actual,
        }),
        None => Err(DomainError::not_found(EntityKind::Story, story.id)),
    }
}

async fn insert_version(
    conn: &mut PgConnection,
    version: &StoryVersion,
) -> Result<(), DomainError> {
    sqlx::query(&format!(
        "INSERT INTO story_versions ({VERSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    ))
    .bind(version.id)
    .bind(version.story_id)
    .bind(version.version_number)
    .bind(&version.snapshot_json)
    .bind(&version.snapshot_hash)
    .bind(version.published_at)
    .bind(&version.notes)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DomainError::Conflict(format!(
                "story {} already has version {}",
                version.story_id, version.version_number
            ))
        } else {
            persistence(e)
        }
    })?;
    Ok(())
}

fn start_node_conflict(err: sqlx::Error, story_id: Uuid) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::Conflict(format!("story {story_id} already has a start node"))
    } else {
        persistence(err)
    }
}

#[async_trait]
impl StoryRepository for PgStoryStore {
    async fn find_story(&self, story_id: Uuid) -> Result<Option<Story>, DomainError> {
        let row = sqlx::query(&format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1"))
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.as_ref()
            .map(story_from_row)
            .transpose()
            .map_err(persistence)
    }

    async fn insert_story(&self, story: &Story) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO stories ({STORY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(story.id)
        .bind(&story.details.title)
        .bind(&story.details.description)
        .bind(&story.details.cover_image)
        .bind(&story.details.genres)
        .bind(&story.details.difficulty)
        .bind(story.status.as_str())
        .bind(story.draft_state.draft_version())
        .bind(story.current_version)
        .bind(story.published_at)
        .bind(Json(&story.metadata))
        .bind(story.revision)
        .bind(story.created_at)
        .bind(story.updated_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn update_story(
        &self,
        story: &Story,
        expected_revision: i64,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        write_story(&mut *conn, story, expected_revision).await
    }

    async fn commit_publication(
        &self,
        story: &Story,
        expected_revision: i64,
        version: &StoryVersion,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        // Dropping `tx` on an early return rolls both writes back.
        if let Err(err) = write_story(&mut *tx, story, expected_revision).await {
            warn!(story_id = %story.id, error = %err, "publication rolled back");
            return Err(err);
        }
        if let Err(err) = insert_version(&mut *tx, version).await {
            warn!(story_id = %story.id, error = %err, "publication rolled back");
            return Err(err);
        }

        tx.commit().await.map_err(persistence)
    }
}

#[async_trait]
impl NodeRepository for PgStoryStore {
    async fn list_nodes_with_choices(
        &self,
        story_id: Uuid,
    ) -> Result<Vec<NodeWithChoices>, DomainError> {
        let node_rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM story_nodes WHERE story_id = $1 ORDER BY created_seq"
        ))
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        let choice_rows = sqlx::query(&format!(
            "SELECT {CHOICE_COLUMNS} FROM story_choices WHERE story_id = $1 \
             ORDER BY sort_order, created_seq"
        ))
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        let choices = choice_rows
            .iter()
            .map(choice_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence)?;

        node_rows
            .iter()
            .map(|row| {
                let node = node_from_row(row).map_err(persistence)?;
                let outgoing = choices
                    .iter()
                    .filter(|c| c.source_node_id == node.id)
                    .cloned()
                    .collect();
                Ok(NodeWithChoices {
                    node,
                    choices: outgoing,
                })
            })
            .collect()
    }

    async fn find_node(&self, node_id: Uuid) -> Result<Option<Node>, DomainError> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM story_nodes WHERE id = $1"))
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.as_ref()
            .map(node_from_row)
            .transpose()
            .map_err(persistence)
    }

    async fn insert_node(&self, node: &Node) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO story_nodes ({NODE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(node.id)
        .bind(node.story_id)
        .bind(&node.title)
        .bind(&node.content)
        .bind(node.is_start)
        .bind(node.is_ending)
        .bind(node.position.x)
        .bind(node.position.y)
        .bind(Json(&node.metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| start_node_conflict(e, node.story_id))?;
        Ok(())
    }

    async fn update_node(&self, node: &Node) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE story_nodes SET title = $2, content = $3, is_start = $4, is_ending = $5, \
             position_x = $6, position_y = $7, metadata = $8 WHERE id = $1",
        )
        .bind(node.id)
        .bind(&node.title)
        .bind(&node.content)
        .bind(node.is_start)
        .bind(node.is_ending)
        .bind(node.position.x)
        .bind(node.position.y)
        .bind(Json(&node.metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| start_node_conflict(e, node.story_id))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(EntityKind::Node, node.id));
        }
        Ok(())
    }

    async fn delete_node(&self, node_id: Uuid) -> Result<(), DomainError> {
        // Choices referencing the node go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM story_nodes WHERE id = $1")
            .bind(node_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(EntityKind::Node, node_id));
        }
        Ok(())
    }

    async fn find_choice(&self, choice_id: Uuid) -> Result<Option<Choice>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {CHOICE_COLUMNS} FROM story_choices WHERE id = $1"
        ))
        .bind(choice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        row.as_ref()
            .map(choice_from_row)
            .transpose()
            .map_err(persistence)
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO story_choices ({CHOICE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(choice.id)
        .bind(choice.story_id)
        .bind(choice.source_node_id)
        .bind(choice.target_node_id)
        .bind(&choice.text)
        .bind(choice.order)
        .bind(Json(&choice.conditions))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn update_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE story_choices SET source_node_id = $2, target_node_id = $3, text = $4, \
             sort_order = $5, conditions = $6 WHERE id = $1",
        )
        .bind(choice.id)
        .bind(choice.source_node_id)
        .bind(choice.target_node_id)
        .bind(&choice.text)
        .bind(choice.order)
        .bind(Json(&choice.conditions))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(EntityKind::Choice, choice.id));
        }
        Ok(())
    }

    async fn delete_choice(&self, choice_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM story_choices WHERE id = $1")
            .bind(choice_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(EntityKind::Choice, choice_id));
        }
        Ok(())
    }
}

#[async_trait]
impl VersionRepository for PgStoryStore {
    async fn latest_version(&self, story_id: Uuid) -> Result<Option<StoryVersion>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM story_versions WHERE story_id = $1 \
             ORDER BY version_number DESC LIMIT 1"
        ))
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        row.as_ref()
            .map(version_from_row)
            .transpose()
            .map_err(persistence)
    }

    async fn find_version(
        &self,
        story_id: Uuid,
        version_number: i32,
    ) -> Result<Option<StoryVersion>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM story_versions \
             WHERE story_id = $1 AND version_number = $2"
        ))
        .bind(story_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        row.as_ref()
            .map(version_from_row)
            .transpose()
            .map_err(persistence)
    }

    async fn list_versions(&self, story_id: Uuid) -> Result<Vec<StoryVersion>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM story_versions WHERE story_id = $1 \
             ORDER BY version_number DESC"
        ))
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        rows.iter()
            .map(version_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence)
    }

    async fn create_version(&self, version: &StoryVersion) -> Result<(), DomainError> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        insert_version(&mut *conn, version).await
    }
}
