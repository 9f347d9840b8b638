//! Reference data repository: users, courses and rooms.
//!
//! # Responsibility
//! - Persist and load the directory entries sections and records hydrate.
//!
//! # Invariants
//! - Email, course code and room name uniqueness are schema constraints and
//!   surface as `RepoError::Duplicate`.

use super::rows::{parse_user, uuid_col, PLAIN_USER, USER_COLUMNS};
use super::{map_constraint, Entity, RepoError, RepoResult};
use crate::model::catalog::{Course, CourseId, Room, RoomId, UserProfile};
use crate::model::principal::{Role, UserId};
use rusqlite::{params, Connection};

/// Repository interface for reference data.
pub trait CatalogRepository {
    fn create_user(&self, user: &UserProfile) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<UserProfile>>;
    /// Points a student at an advisor; `None` clears the assignment.
    fn assign_advisor(&self, student_id: UserId, advisor_id: Option<UserId>) -> RepoResult<()>;
    fn create_course(&self, course: &Course) -> RepoResult<CourseId>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn create_room(&self, room: &Room) -> RepoResult<RoomId>;
    fn get_room(&self, id: RoomId) -> RepoResult<Option<Room>>;
}

/// SQLite-backed reference data repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_user(&self, user: &UserProfile) -> RepoResult<UserId> {
        if let Some(advisor_id) = user.advisor_id {
            ensure_lecturer(self, advisor_id)?;
        }
        self.conn
            .execute(
                "INSERT INTO users (id, name, email, role, student_number, advisor_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    user.id.to_string(),
                    user.name.as_str(),
                    user.email.as_str(),
                    user.role.as_str(),
                    user.student_number.as_deref(),
                    user.advisor_id.map(|id| id.to_string()),
                ],
            )
            .map_err(|err| map_constraint(err, || format!("user email `{}`", user.email)))?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user(row, &PLAIN_USER)?));
        }
        Ok(None)
    }

    fn assign_advisor(&self, student_id: UserId, advisor_id: Option<UserId>) -> RepoResult<()> {
        if let Some(advisor_id) = advisor_id {
            ensure_lecturer(self, advisor_id)?;
        }
        let changed = self.conn.execute(
            "UPDATE users SET advisor_id = ?2 WHERE id = ?1 AND role = 'student';",
            params![student_id.to_string(), advisor_id.map(|id| id.to_string())],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::User, student_id));
        }
        Ok(())
    }

    fn create_course(&self, course: &Course) -> RepoResult<CourseId> {
        self.conn
            .execute(
                "INSERT INTO courses (id, code, name, credits) VALUES (?1, ?2, ?3, ?4);",
                params![
                    course.id.to_string(),
                    course.code.as_str(),
                    course.name.as_str(),
                    i64::from(course.credits),
                ],
            )
            .map_err(|err| map_constraint(err, || format!("course code `{}`", course.code)))?;
        Ok(course.id)
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, name, credits FROM courses WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let credits: i64 = row.get("credits")?;
            return Ok(Some(Course {
                id: uuid_col(row, "id")?,
                code: row.get("code")?,
                name: row.get("name")?,
                credits: u32::try_from(credits).map_err(|_| {
                    RepoError::InvalidData(format!("invalid credits `{credits}` in courses.credits"))
                })?,
            }));
        }
        Ok(None)
    }

    fn create_room(&self, room: &Room) -> RepoResult<RoomId> {
        self.conn
            .execute(
                "INSERT INTO rooms (id, name) VALUES (?1, ?2);",
                params![room.id.to_string(), room.name.as_str()],
            )
            .map_err(|err| map_constraint(err, || format!("room name `{}`", room.name)))?;
        Ok(room.id)
    }

    fn get_room(&self, id: RoomId) -> RepoResult<Option<Room>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM rooms WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Room {
                id: uuid_col(row, "id")?,
                name: row.get("name")?,
            }));
        }
        Ok(None)
    }
}

fn ensure_lecturer(repo: &SqliteCatalogRepository<'_>, advisor_id: UserId) -> RepoResult<()> {
    match repo.get_user(advisor_id)? {
        Some(advisor) if advisor.role == Role::Lecturer => Ok(()),
        Some(advisor) => Err(RepoError::InvalidData(format!(
            "advisor {advisor_id} has role {}, expected lecturer",
            advisor.role
        ))),
        None => Err(RepoError::not_found(Entity::User, advisor_id)),
    }
}
