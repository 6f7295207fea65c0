mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::engine::ProgressStore;
use crate::error::ProgressError;
use crate::models::*;

/// SQLite-backed store for courses, their structure and the progress ledger.
///
/// Cheap to clone; clones share one connection. Every method takes the
/// connection lock for the duration of its statements only, so no state is
/// held between requests.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const NODE_COLUMNS: &str =
    "id, course_id, mission_id, title, node_type, position_index, content, created_at";

const PROGRESS_COLUMNS: &str = "user_id, node_id, status, created_at, updated_at, completed_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    // ============================================================
    // Course operations
    // ============================================================

    pub fn get_all_courses(&self) -> Result<Vec<Course>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, created_at, updated_at
             FROM courses ORDER BY title",
        )?;

        let courses = stmt
            .query_map([], course_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(courses)
    }

    pub fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT id, title, description, created_at, updated_at
                 FROM courses WHERE id = ?",
                [id.to_string()],
                course_from_row,
            )
            .optional()?;
        Ok(course)
    }

    pub fn create_course(&self, input: CreateCourseInput) -> Result<Course> {
        let conn = self.lock()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO courses (id, title, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.title,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Course {
            id,
            title: input.title,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    // ============================================================
    // Level and Mission operations
    // ============================================================

    pub fn create_level(&self, course_id: Uuid, input: CreateLevelInput) -> Result<Level> {
        check_position("position", input.position)?;
        self.get_course(course_id)?
            .ok_or_else(|| ProgressError::NotFound("Course".to_string()))?;

        let conn = self.lock()?;
        let id = Uuid::new_v4();
        let position = match input.position {
            Some(p) => p,
            None => conn.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM levels WHERE course_id = ?",
                [course_id.to_string()],
                |row| row.get(0),
            )?,
        };

        conn.execute(
            "INSERT INTO levels (id, course_id, title, position) VALUES (?, ?, ?, ?)",
            (id.to_string(), course_id.to_string(), &input.title, position),
        )?;

        Ok(Level {
            id,
            course_id,
            title: input.title,
            position,
        })
    }

    pub fn get_levels(&self, course_id: Uuid) -> Result<Vec<Level>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, course_id, title, position
             FROM levels WHERE course_id = ? ORDER BY position",
        )?;

        let levels = stmt
            .query_map([course_id.to_string()], |row| {
                Ok(Level {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    course_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(levels)
    }

    pub fn get_level(&self, id: Uuid) -> Result<Option<Level>> {
        let conn = self.lock()?;
        let level = conn
            .query_row(
                "SELECT id, course_id, title, position FROM levels WHERE id = ?",
                [id.to_string()],
                |row| {
                    Ok(Level {
                        id: parse_uuid(row.get::<_, String>(0)?),
                        course_id: parse_uuid(row.get::<_, String>(1)?),
                        title: row.get(2)?,
                        position: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(level)
    }

    pub fn create_mission(&self, level_id: Uuid, input: CreateMissionInput) -> Result<Mission> {
        check_position("position", input.position)?;
        self.get_level(level_id)?
            .ok_or_else(|| ProgressError::NotFound("Level".to_string()))?;

        let conn = self.lock()?;
        let id = Uuid::new_v4();
        let position = match input.position {
            Some(p) => p,
            None => conn.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM missions WHERE level_id = ?",
                [level_id.to_string()],
                |row| row.get(0),
            )?,
        };

        conn.execute(
            "INSERT INTO missions (id, level_id, title, position) VALUES (?, ?, ?, ?)",
            (id.to_string(), level_id.to_string(), &input.title, position),
        )?;

        Ok(Mission {
            id,
            level_id,
            title: input.title,
            position,
        })
    }

    /// Missions of every level of a course, ordered by level then mission position.
    pub fn get_course_missions(&self, course_id: Uuid) -> Result<Vec<Mission>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT m.id, m.level_id, m.title, m.position
             FROM missions m JOIN levels l ON l.id = m.level_id
             WHERE l.course_id = ? ORDER BY l.position, m.position",
        )?;

        let missions = stmt
            .query_map([course_id.to_string()], |row| {
                Ok(Mission {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    level_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(missions)
    }

    // ============================================================
    // Node operations
    // ============================================================

    pub fn create_node(&self, course_id: Uuid, input: CreateNodeInput) -> Result<Node> {
        self.get_course(course_id)?
            .ok_or_else(|| ProgressError::NotFound("Course".to_string()))?;

        input
            .content
            .validate()
            .map_err(ProgressError::InvalidContent)?;
        check_position("position_index", input.position_index)?;

        let conn = self.lock()?;

        if let Some(mission_id) = input.mission_id {
            let mission_course: Option<String> = conn
                .query_row(
                    "SELECT l.course_id FROM missions m JOIN levels l ON l.id = m.level_id
                     WHERE m.id = ?",
                    [mission_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            if mission_course.map(parse_uuid) != Some(course_id) {
                return Err(ProgressError::NotFound("Mission".to_string()).into());
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let position_index = match input.position_index {
            Some(p) => {
                let taken: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM nodes WHERE course_id = ? AND position_index = ?)",
                    (course_id.to_string(), p),
                    |row| row.get(0),
                )?;
                if taken {
                    return Err(ProgressError::Conflict(format!(
                        "position_index {} is already taken in this course",
                        p
                    ))
                    .into());
                }
                p
            }
            None => conn.query_row(
                "SELECT COALESCE(MAX(position_index) + 1, 0) FROM nodes WHERE course_id = ?",
                [course_id.to_string()],
                |row| row.get(0),
            )?,
        };

        conn.execute(
            "INSERT INTO nodes (id, course_id, mission_id, title, node_type, position_index, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                course_id.to_string(),
                input.mission_id.map(|u| u.to_string()),
                &input.title,
                input.node_type.as_str(),
                position_index,
                serde_json::to_string(&input.content)?,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Node {
            id,
            course_id,
            mission_id: input.mission_id,
            title: input.title,
            node_type: input.node_type,
            position_index,
            content: input.content,
            created_at: now,
        })
    }

    pub fn get_node(&self, id: Uuid) -> Result<Option<Node>> {
        let conn = self.lock()?;
        let node = conn
            .query_row(
                &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
                [id.to_string()],
                node_from_row,
            )
            .optional()?;
        Ok(node)
    }

    /// All nodes of a course ordered by `position_index`.
    pub fn get_course_nodes(&self, course_id: Uuid) -> Result<Vec<Node>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM nodes WHERE course_id = ? ORDER BY position_index",
            NODE_COLUMNS
        ))?;

        let nodes = stmt
            .query_map([course_id.to_string()], node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    pub fn get_node_at_position(&self, course_id: Uuid, position_index: i64) -> Result<Option<Node>> {
        let conn = self.lock()?;
        let node = conn
            .query_row(
                &format!(
                    "SELECT {} FROM nodes WHERE course_id = ? AND position_index = ?",
                    NODE_COLUMNS
                ),
                (course_id.to_string(), position_index),
                node_from_row,
            )
            .optional()?;
        Ok(node)
    }

    /// Assemble the Level → Mission → Node tree of a course.
    ///
    /// Nodes that are not placed in a mission belong to the flat sequence
    /// only and do not appear in the tree.
    pub fn get_course_hierarchy(&self, course_id: Uuid) -> Result<Option<CourseHierarchy>> {
        let Some(course) = self.get_course(course_id)? else {
            return Ok(None);
        };

        let levels = self.get_levels(course_id)?;
        let missions = self.get_course_missions(course_id)?;
        let nodes = self.get_course_nodes(course_id)?;

        let mut nodes_by_mission: HashMap<Uuid, Vec<Node>> = HashMap::new();
        for node in nodes {
            if let Some(mission_id) = node.mission_id {
                nodes_by_mission.entry(mission_id).or_default().push(node);
            }
        }

        let mut missions_by_level: HashMap<Uuid, Vec<MissionTree>> = HashMap::new();
        for mission in missions {
            let nodes = nodes_by_mission.remove(&mission.id).unwrap_or_default();
            missions_by_level
                .entry(mission.level_id)
                .or_default()
                .push(MissionTree { mission, nodes });
        }

        if !nodes_by_mission.is_empty() {
            let count: usize = nodes_by_mission.values().map(Vec::len).sum();
            return Err(ProgressError::InvariantViolation(format!(
                "{} node(s) of course {} are placed in missions outside it",
                count, course_id
            ))
            .into());
        }

        let levels = levels
            .into_iter()
            .map(|level| LevelTree {
                missions: missions_by_level.remove(&level.id).unwrap_or_default(),
                level,
            })
            .collect();

        Ok(Some(CourseHierarchy { course, levels }))
    }

    // ============================================================
    // Progress operations
    // ============================================================

    /// Every progress record `user_id` has on nodes of `course_id`.
    pub fn get_progress_for_course(&self, user_id: &str, course_id: Uuid) -> Result<Vec<ProgressRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.user_id, p.node_id, p.status, p.created_at, p.updated_at, p.completed_at
             FROM progress p JOIN nodes n ON n.id = p.node_id
             WHERE p.user_id = ? AND n.course_id = ?
             ORDER BY n.position_index",
        )?;

        let records = stmt
            .query_map((user_id, course_id.to_string()), progress_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn get_progress_record(&self, user_id: &str, node_id: Uuid) -> Result<Option<ProgressRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM progress WHERE user_id = ? AND node_id = ?",
                    PROGRESS_COLUMNS
                ),
                (user_id, node_id.to_string()),
                progress_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Upsert `(user, node)` to completed. An existing completed record is
    /// left exactly as it is.
    pub fn mark_node_completed(&self, user_id: &str, node_id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO progress (user_id, node_id, status, created_at, updated_at, completed_at)
             VALUES (?1, ?2, 'completed', ?3, ?3, ?3)
             ON CONFLICT(user_id, node_id) DO UPDATE SET
                 status = 'completed',
                 updated_at = excluded.updated_at,
                 completed_at = excluded.completed_at
             WHERE progress.status <> 'completed'",
            (user_id, node_id.to_string(), &now),
        )?;
        Ok(())
    }

    /// Insert an unlocked `(user, node)` record in one statement unless any
    /// record already exists. Returns whether a record was created.
    pub fn unlock_node_if_absent(&self, user_id: &str, node_id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            "INSERT INTO progress (user_id, node_id, status, created_at, updated_at)
             VALUES (?1, ?2, 'unlocked', ?3, ?3)
             ON CONFLICT(user_id, node_id) DO NOTHING",
            (user_id, node_id.to_string(), &now),
        )?;
        Ok(rows > 0)
    }
}

impl ProgressStore for Database {
    fn find_node(&self, node_id: Uuid) -> Result<Option<Node>> {
        self.get_node(node_id)
    }

    fn find_node_at_position(&self, course_id: Uuid, position_index: i64) -> Result<Option<Node>> {
        self.get_node_at_position(course_id, position_index)
    }

    fn mark_completed(&self, user_id: &str, node_id: Uuid) -> Result<()> {
        self.mark_node_completed(user_id, node_id)
    }

    fn unlock_if_absent(&self, user_id: &str, node_id: Uuid) -> Result<bool> {
        self.unlock_node_if_absent(user_id, node_id)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `<data dir>/learnpath/learnpath.db` for the current user.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "learnpath")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("learnpath.db"))
}

/// Positions are zero-based; `None` means append.
fn check_position(field: &str, position: Option<i64>) -> Result<(), ProgressError> {
    match position {
        Some(p) if p < 0 => Err(ProgressError::InvalidContent(format!(
            "{} must not be negative, got {}",
            field, p
        ))),
        _ => Ok(()),
    }
}

fn course_from_row(row: &Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn node_from_row(row: &Row) -> rusqlite::Result<Node> {
    let content_json: String = row.get(6)?;
    let content: NodeContent = serde_json::from_str(&content_json).unwrap_or_else(|e| {
        tracing::warn!("Unreadable node content, rendering as empty: {}", e);
        NodeContent::default()
    });

    Ok(Node {
        id: parse_uuid(row.get::<_, String>(0)?),
        course_id: parse_uuid(row.get::<_, String>(1)?),
        mission_id: row.get::<_, Option<String>>(2)?.map(parse_uuid),
        title: row.get(3)?,
        node_type: NodeType::from_str(&row.get::<_, String>(4)?).unwrap_or(NodeType::Lesson),
        position_index: row.get(5)?,
        content,
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn progress_from_row(row: &Row) -> rusqlite::Result<ProgressRecord> {
    Ok(ProgressRecord {
        user_id: row.get(0)?,
        node_id: parse_uuid(row.get::<_, String>(1)?),
        status: ProgressStatus::from_str(&row.get::<_, String>(2)?)
            .unwrap_or(ProgressStatus::Unlocked),
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
        completed_at: row.get::<_, Option<String>>(5)?.map(parse_datetime),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(db: &Database, title: &str) -> Course {
        db.create_course(CreateCourseInput {
            title: title.to_string(),
            description: None,
        })
        .unwrap()
    }

    #[test]
    fn hierarchy_rejects_node_in_foreign_mission() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let ours = course(&db, "Ours");
        let theirs = course(&db, "Theirs");
        let level = db
            .create_level(theirs.id, CreateLevelInput { title: "L".to_string(), position: None })
            .unwrap();
        let mission = db
            .create_mission(level.id, CreateMissionInput { title: "M".to_string(), position: None })
            .unwrap();

        // create_node refuses this placement, so write the row directly.
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO nodes (id, course_id, mission_id, title, position_index, created_at)
                 VALUES (?, ?, ?, 'Stray', 0, ?)",
                (
                    Uuid::new_v4().to_string(),
                    ours.id.to_string(),
                    mission.id.to_string(),
                    Utc::now().to_rfc3339(),
                ),
            )
            .unwrap();

        let err = db.get_course_hierarchy(ours.id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProgressError>(),
            Some(ProgressError::InvariantViolation(_))
        ));
        assert!(db.get_course_hierarchy(theirs.id).unwrap().is_some());
    }

    #[test]
    fn negative_positions_are_rejected() {
        assert!(check_position("position", Some(-1)).is_err());
        assert!(check_position("position", Some(0)).is_ok());
        assert!(check_position("position", None).is_ok());
    }
}
