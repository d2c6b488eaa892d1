use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::{AppError, AppResult};
use crate::models::user::DbUser;
use crate::utils::utc_now;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at, deleted_at";

pub struct NewUser<'a> {
	pub name: &'a str,
	pub email: &'a str,
	pub password_hash: &'a str,
	pub role: Role,
}

pub async fn insert(pool: &SqlitePool, user: NewUser<'_>) -> AppResult<DbUser> {
	let now = utc_now();
	let user_id = Uuid::new_v4();

	sqlx::query(
		"INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(user_id)
	.bind(user.name)
	.bind(user.email)
	.bind(user.password_hash)
	.bind(user.role.as_str())
	.bind(now)
	.bind(now)
	.execute(pool)
	.await
	.map_err(|err| match err.as_database_error() {
		// a concurrent registration won the race past ensure_email_available
		Some(db_err) if db_err.is_unique_violation() => AppError::conflict("email already in use"),
		_ => AppError::from(err),
	})?;

	fetch_by_id(pool, user_id).await
}

pub async fn fetch_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
	let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL");
	sqlx::query_as::<_, DbUser>(&sql)
		.bind(user_id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
	let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND deleted_at IS NULL");
	let user = sqlx::query_as::<_, DbUser>(&sql)
		.bind(email)
		.fetch_optional(pool)
		.await?;
	Ok(user)
}

pub async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
	let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
		.bind(email)
		.fetch_one(pool)
		.await?;

	if count > 0 {
		return Err(AppError::conflict("email already in use"));
	}

	Ok(())
}

pub async fn update_role(pool: &SqlitePool, user_id: Uuid, role: Role) -> AppResult<DbUser> {
	let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
		.bind(role.as_str())
		.bind(utc_now())
		.bind(user_id)
		.execute(pool)
		.await?;

	if result.rows_affected() == 0 {
		return Err(AppError::not_found("user not found"));
	}

	fetch_by_id(pool, user_id).await
}
