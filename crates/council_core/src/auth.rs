use crate::db::{new_id, now_ms, enum_column};
use crate::error::{CouncilError, Result};
use crate::identity::find_user_by_email;
use crate::schema::{AdminRole, AdminUser, Id};
use rusqlite::{params, Connection, OptionalExtension};

pub fn require_caller(caller: Option<&str>) -> Result<&str> {
    caller
        .filter(|id| !id.trim().is_empty())
        .ok_or(CouncilError::AuthenticationRequired)
}

/// Guard for every privileged operation: the caller must be signed in and
/// hold a row in `admin_users`.
pub fn require_admin(conn: &Connection, caller: Option<&str>) -> Result<AdminUser> {
    let user_id = require_caller(caller)?;
    match find_admin(conn, user_id)? {
        Some(admin) => Ok(admin),
        None => {
            tracing::warn!(user_id, "admin role required");
            Err(CouncilError::AuthorizationDenied)
        }
    }
}

pub fn require_super_admin(conn: &Connection, caller: Option<&str>) -> Result<AdminUser> {
    let admin = require_admin(conn, caller)?;
    if admin.role != AdminRole::SuperAdmin {
        tracing::warn!(user_id = %admin.user_id, "superAdmin role required");
        return Err(CouncilError::AuthorizationDenied);
    }
    Ok(admin)
}

pub fn find_admin(conn: &Connection, user_id: &str) -> Result<Option<AdminUser>> {
    let admin = conn
        .query_row(
            "SELECT id, user_id, role, granted_by, granted_at FROM admin_users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(AdminUser {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: enum_column(row, 2)?,
                    granted_by: row.get(3)?,
                    granted_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(admin)
}

/// Grants (or re-grants with a new role) admin rights to the user with
/// `email`. `granted_by` is `None` for operator bootstrap.
pub fn grant_admin(
    conn: &Connection,
    email: &str,
    role: AdminRole,
    granted_by: Option<&Id>,
) -> Result<AdminUser> {
    let user = find_user_by_email(conn, email)?.ok_or(CouncilError::NotFound("user"))?;
    let admin = AdminUser {
        id: new_id(),
        user_id: user.id,
        role,
        granted_by: granted_by.cloned(),
        granted_at: now_ms(),
    };
    conn.execute(
        r#"
        INSERT INTO admin_users (id, user_id, role, granted_by, granted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id) DO UPDATE SET
          role=excluded.role,
          granted_by=excluded.granted_by,
          granted_at=excluded.granted_at
        "#,
        params![
            admin.id,
            admin.user_id,
            admin.role.as_str(),
            admin.granted_by,
            admin.granted_at
        ],
    )?;
    tracing::info!(user_id = %admin.user_id, role = %admin.role, "granted admin role");

    find_admin(conn, &admin.user_id)?.ok_or(CouncilError::NotFound("admin user"))
}
