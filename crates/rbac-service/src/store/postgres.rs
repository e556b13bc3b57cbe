//! PostgreSQL 저장소.
//!
//! 변경 연산은 대부분 단일 SQL 문입니다. 기본 역할 교체와 메뉴 부모 변경은
//! 트랜잭션 안에서 검사와 기록을 함께 수행합니다. 고유 제약 위반은
//! `From<sqlx::Error>`에서 [`super::StoreError::UniqueViolation`]으로 변환됩니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_core::{
    DatabaseConfig, Menu, MembershipWithRole, NewSession, Permissions, Role, RoleMenuAccess,
    Session, User, UserRoleMembership,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use super::{
    AccessStore, MembershipStore, MenuStore, RoleStore, SessionStore, StoreError, StoreResult,
    UserStore,
};

/// 메뉴 부모 변경용 advisory lock 키.
const MENU_TREE_LOCK: i64 = 0x5242_4143_4d45_4e55;

// ================================================================================================
// Rows
// ================================================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    full_name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    code: String,
    #[sqlx(default)]
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    is_default: bool,
    #[sqlx(default)]
    assigned_by: Option<Uuid>,
    assigned_at: DateTime<Utc>,
}

impl From<MembershipRow> for UserRoleMembership {
    fn from(row: MembershipRow) -> Self {
        UserRoleMembership {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            is_default: row.is_default,
            assigned_by: row.assigned_by,
            assigned_at: row.assigned_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipWithRoleRow {
    #[sqlx(flatten)]
    membership: MembershipRow,
    role_name: String,
    role_code: String,
    #[sqlx(default)]
    role_description: Option<String>,
    role_is_active: bool,
    role_created_at: DateTime<Utc>,
    role_updated_at: DateTime<Utc>,
}

impl From<MembershipWithRoleRow> for MembershipWithRole {
    fn from(row: MembershipWithRoleRow) -> Self {
        let role = Role {
            id: row.membership.role_id,
            name: row.role_name,
            code: row.role_code,
            description: row.role_description,
            is_active: row.role_is_active,
            created_at: row.role_created_at,
            updated_at: row.role_updated_at,
        };
        MembershipWithRole {
            membership: row.membership.into(),
            role,
        }
    }
}

#[derive(Debug, FromRow)]
struct MenuRow {
    id: Uuid,
    #[sqlx(default)]
    parent_id: Option<Uuid>,
    name: String,
    code: String,
    #[sqlx(default)]
    url: Option<String>,
    #[sqlx(default)]
    icon: Option<String>,
    menu_order: i32,
    level: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            id: row.id,
            parent_id: row.parent_id,
            name: row.name,
            code: row.code,
            url: row.url,
            icon: row.icon,
            order: row.menu_order,
            level: row.level,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AccessRow {
    id: Uuid,
    role_id: Uuid,
    menu_id: Uuid,
    can_view: bool,
    can_create: bool,
    can_update: bool,
    can_delete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccessRow> for RoleMenuAccess {
    fn from(row: AccessRow) -> Self {
        RoleMenuAccess {
            id: row.id,
            role_id: row.role_id,
            menu_id: row.menu_id,
            permissions: Permissions {
                can_view: row.can_view,
                can_create: row.can_create,
                can_update: row.can_update,
                can_delete: row.can_delete,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    access_token: String,
    refresh_token: String,
    #[sqlx(default)]
    ip_address: Option<String>,
    #[sqlx(default)]
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, is_active, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, name, code, description, is_active, created_at, updated_at";
const MENU_COLUMNS: &str =
    "id, parent_id, name, code, url, icon, menu_order, level, is_active, created_at, updated_at";
const ACCESS_COLUMNS: &str =
    "id, role_id, menu_id, can_view, can_create, can_update, can_delete, created_at, updated_at";

// ================================================================================================
// Store
// ================================================================================================

/// PostgreSQL RBAC 저장소.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// 기존 풀로 저장소를 생성합니다.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 설정으로 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 스키마 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;

        info!("Migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 LIMIT 1"
        ))
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn user_conflicts(&self, username: &str, email: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, full_name = $5,
                is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    async fn role_conflicts(&self, name: &str, code: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 OR code = $2)")
                .bind(name)
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, code, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.code)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, is_active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithRole>> {
        let rows = sqlx::query_as::<_, MembershipWithRoleRow>(
            r#"
            SELECT
                ur.id, ur.user_id, ur.role_id, ur.is_default, ur.assigned_by, ur.assigned_at,
                r.name AS role_name, r.code AS role_code, r.description AS role_description,
                r.is_active AS role_is_active, r.created_at AS role_created_at,
                r.updated_at AS role_updated_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at, ur.seq
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MembershipWithRole::from).collect())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRoleMembership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, role_id, is_default, assigned_by, assigned_at
            FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRoleMembership::from))
    }

    async fn insert_membership(&self, membership: &UserRoleMembership) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        // 같은 사용자에 대한 동시 할당 직렬화
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(membership.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (id, user_id, role_id, is_default, assigned_by, assigned_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.role_id)
        .bind(membership.is_default)
        .bind(membership.assigned_by)
        .bind(membership.assigned_at)
        .execute(&mut *tx)
        .await?;

        let cleared = if membership.is_default {
            sqlx::query(
                r#"
                UPDATE user_roles SET is_default = FALSE
                WHERE user_id = $1 AND id <> $2 AND is_default = TRUE
                "#,
            )
            .bind(membership.user_id)
            .bind(membership.id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        } else {
            0
        };

        tx.commit().await?;
        Ok(cleared)
    }

    async fn delete_membership(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MenuStore for PgStore {
    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus ORDER BY menu_order, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Menu::from).collect())
    }

    async fn find_menu(&self, id: Uuid) -> StoreResult<Option<Menu>> {
        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Menu::from))
    }

    async fn find_menu_by_code(&self, code: &str) -> StoreResult<Option<Menu>> {
        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Menu::from))
    }

    async fn insert_menu(&self, menu: &Menu) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO menus (id, parent_id, name, code, url, icon, menu_order, level, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(menu.id)
        .bind(menu.parent_id)
        .bind(&menu.name)
        .bind(&menu.code)
        .bind(&menu.url)
        .bind(&menu.icon)
        .bind(menu.order)
        .bind(menu.level)
        .bind(menu.is_active)
        .bind(menu.created_at)
        .bind(menu.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_menu(&self, menu: &Menu) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        // 부모 변경끼리 직렬화해 두 이동이 함께 순환을 만들지 않도록 함
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MENU_TREE_LOCK)
            .execute(&mut *tx)
            .await?;

        if let Some(parent_id) = menu.parent_id {
            let cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors(id, parent_id) AS (
                    SELECT id, parent_id FROM menus WHERE id = $1
                    UNION
                    SELECT m.id, m.parent_id FROM menus m JOIN ancestors a ON m.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                "#,
            )
            .bind(parent_id)
            .bind(menu.id)
            .fetch_one(&mut *tx)
            .await?;
            if cycle {
                return Err(StoreError::CircularParent);
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE menus
            SET parent_id = $2, name = $3, url = $4, icon = $5, menu_order = $6,
                level = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(menu.id)
        .bind(menu.parent_id)
        .bind(&menu.name)
        .bind(&menu.url)
        .bind(&menu.icon)
        .bind(menu.order)
        .bind(menu.level)
        .bind(menu.is_active)
        .bind(menu.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn delete_menu(&self, id: Uuid) -> StoreResult<u64> {
        // role_menu_access는 ON DELETE CASCADE로 함께 삭제됨
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccessStore for PgStore {
    async fn find_access(&self, id: Uuid) -> StoreResult<Option<RoleMenuAccess>> {
        let row = sqlx::query_as::<_, AccessRow>(&format!(
            "SELECT {ACCESS_COLUMNS} FROM role_menu_access WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RoleMenuAccess::from))
    }

    async fn find_access_for(
        &self,
        role_id: Uuid,
        menu_id: Uuid,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        let row = sqlx::query_as::<_, AccessRow>(&format!(
            "SELECT {ACCESS_COLUMNS} FROM role_menu_access WHERE role_id = $1 AND menu_id = $2"
        ))
        .bind(role_id)
        .bind(menu_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RoleMenuAccess::from))
    }

    async fn find_access_by_code(
        &self,
        role_id: Uuid,
        menu_code: &str,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        let row = sqlx::query_as::<_, AccessRow>(
            r#"
            SELECT a.id, a.role_id, a.menu_id, a.can_view, a.can_create, a.can_update,
                   a.can_delete, a.created_at, a.updated_at
            FROM role_menu_access a
            JOIN menus m ON m.id = a.menu_id
            WHERE a.role_id = $1 AND m.code = $2
            "#,
        )
        .bind(role_id)
        .bind(menu_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RoleMenuAccess::from))
    }

    async fn list_access_for_role(&self, role_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        let rows = sqlx::query_as::<_, AccessRow>(
            r#"
            SELECT a.id, a.role_id, a.menu_id, a.can_view, a.can_create, a.can_update,
                   a.can_delete, a.created_at, a.updated_at
            FROM role_menu_access a
            JOIN menus m ON m.id = a.menu_id
            WHERE a.role_id = $1
            ORDER BY m.menu_order, m.created_at
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RoleMenuAccess::from).collect())
    }

    async fn list_access_for_menu(&self, menu_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        let rows = sqlx::query_as::<_, AccessRow>(&format!(
            "SELECT {ACCESS_COLUMNS} FROM role_menu_access WHERE menu_id = $1 ORDER BY created_at"
        ))
        .bind(menu_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RoleMenuAccess::from).collect())
    }

    async fn insert_access(&self, access: &RoleMenuAccess) -> StoreResult<()> {
        let p = access.permissions;
        sqlx::query(
            r#"
            INSERT INTO role_menu_access
                (id, role_id, menu_id, can_view, can_create, can_update, can_delete, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(access.id)
        .bind(access.role_id)
        .bind(access.menu_id)
        .bind(p.can_view)
        .bind(p.can_create)
        .bind(p.can_update)
        .bind(p.can_delete)
        .bind(access.created_at)
        .bind(access.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_access(&self, access: &RoleMenuAccess) -> StoreResult<u64> {
        let p = access.permissions;
        let result = sqlx::query(
            r#"
            UPDATE role_menu_access
            SET can_view = $2, can_create = $3, can_update = $4, can_delete = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(access.id)
        .bind(p.can_view)
        .bind(p.can_create)
        .bind(p.can_update)
        .bind(p.can_delete)
        .bind(access.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_access(&self, id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM role_menu_access WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        let session = session.into_session();
        sqlx::query(
            r#"
            INSERT INTO sessions
                (id, user_id, role_id, access_token, refresh_token, ip_address, user_agent, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.role_id)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, role_id, access_token, refresh_token, ip_address, user_agent,
                   expires_at, created_at
            FROM sessions
            WHERE refresh_token = $1 AND user_id = $2 AND expires_at > $3
            LIMIT 1
            "#,
        )
        .bind(refresh_token)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    async fn replace_access_token(
        &self,
        session_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE sessions SET access_token = $2 WHERE id = $1")
            .bind(session_id)
            .bind(access_token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_user_and_token(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND access_token = $2")
            .bind(user_id)
            .bind(access_token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
