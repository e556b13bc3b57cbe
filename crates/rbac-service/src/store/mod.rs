//! 영속성 포트.
//!
//! 서비스는 이 트레이트들을 통해서만 저장소에 접근합니다. 각 변경 연산은
//! 저장소 수준에서 원자적이어야 하며, 고유 제약 위반은
//! [`StoreError::UniqueViolation`]으로 보고합니다. 여러 행에 걸친 불변식
//! (사용자당 기본 역할 1개, 메뉴 트리 비순환)은 해당 변경 연산 안에서
//! 다시 확인되므로 프로세스가 여러 개여도 유지됩니다.
//!
//! 구현체:
//! - [`MemoryStore`]: 테스트와 임베딩용 인메모리 저장소
//! - [`PgStore`]: PostgreSQL (sqlx)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_core::{
    Menu, MembershipWithRole, NewSession, RbacError, Role, RoleMenuAccess, Session, User,
    UserRoleMembership,
};
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// 스키마의 고유 제약 이름. 두 구현체가 같은 이름을 보고합니다.
pub mod constraints {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const ROLES_NAME: &str = "roles_name_key";
    pub const ROLES_CODE: &str = "roles_code_key";
    pub const MENUS_CODE: &str = "menus_code_key";
    pub const ACCESS_ROLE_MENU: &str = "role_menu_access_role_menu_key";
    pub const USER_ROLES_USER_ROLE: &str = "user_roles_user_role_key";
}

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 고유 제약 위반
    #[error("고유 제약 위반: {constraint}")]
    UniqueViolation { constraint: String },

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(sqlx::Error),

    /// 참조 무결성이 깨진 데이터
    #[error("손상된 데이터: {0}")]
    Corrupted(String),

    /// 부모 변경이 메뉴 트리에 순환을 만듦
    #[error("메뉴 트리 순환")]
    CircularParent,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // PostgreSQL 고유 제약 조건 위반 (23505)
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for RbacError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CircularParent => RbacError::CircularReference,
            other => RbacError::Storage(other.to_string()),
        }
    }
}

impl StoreError {
    /// 고유 제약 위반이면 `conflict`로, 아니면 저장소 에러로 변환합니다.
    pub fn or_conflict(self, conflict: RbacError) -> RbacError {
        match self {
            StoreError::UniqueViolation { .. } => conflict,
            StoreError::CircularParent => RbacError::CircularReference,
            other => RbacError::Storage(other.to_string()),
        }
    }
}

/// 저장소 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

/// 사용자 저장소.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// 사용자 이름 또는 이메일로 조회합니다.
    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// 사용자 이름 또는 이메일이 이미 사용 중인지 확인합니다.
    async fn user_conflicts(&self, username: &str, email: &str) -> StoreResult<bool>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// ID가 같은 레코드를 교체합니다. 교체된 행 수를 반환합니다.
    async fn update_user(&self, user: &User) -> StoreResult<u64>;
}

/// 역할 저장소.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>>;

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    /// 이름 또는 코드가 이미 사용 중인지 확인합니다.
    async fn role_conflicts(&self, name: &str, code: &str) -> StoreResult<bool>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    async fn insert_role(&self, role: &Role) -> StoreResult<()>;

    async fn update_role(&self, role: &Role) -> StoreResult<u64>;
}

/// 사용자-역할 할당 저장소.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// 사용자의 할당을 역할과 함께 할당 시각 오름차순으로 반환합니다.
    ///
    /// 시각이 같으면 삽입 순서를 유지합니다. 역할 선택기가 요구하는
    /// 안정적인 순서입니다.
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithRole>>;

    async fn find_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRoleMembership>>;

    /// 할당을 추가합니다.
    ///
    /// `is_default`이면 같은 원자 단위에서 사용자의 다른 할당의 기본 플래그를
    /// 내리고 내린 개수를 반환합니다. 삽입이 실패하면 아무것도 바뀌지 않습니다.
    async fn insert_membership(&self, membership: &UserRoleMembership) -> StoreResult<u64>;

    async fn delete_membership(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<u64>;
}

/// 메뉴 저장소.
#[async_trait]
pub trait MenuStore: Send + Sync {
    /// 모든 메뉴를 `order` 오름차순으로 반환합니다.
    async fn list_menus(&self) -> StoreResult<Vec<Menu>>;

    async fn find_menu(&self, id: Uuid) -> StoreResult<Option<Menu>>;

    async fn find_menu_by_code(&self, code: &str) -> StoreResult<Option<Menu>>;

    async fn insert_menu(&self, menu: &Menu) -> StoreResult<()>;

    /// 메뉴를 교체합니다.
    ///
    /// 새 부모의 조상 사슬에 이 메뉴가 있으면 기록하지 않고
    /// [`StoreError::CircularParent`]를 반환합니다. 검사와 기록은 원자적입니다.
    async fn update_menu(&self, menu: &Menu) -> StoreResult<u64>;

    /// 메뉴와 그 메뉴의 권한 행을 삭제합니다.
    async fn delete_menu(&self, id: Uuid) -> StoreResult<u64>;
}

/// 역할-메뉴 권한 저장소.
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_access(&self, id: Uuid) -> StoreResult<Option<RoleMenuAccess>>;

    async fn find_access_for(
        &self,
        role_id: Uuid,
        menu_id: Uuid,
    ) -> StoreResult<Option<RoleMenuAccess>>;

    /// 메뉴 코드로 (역할, 메뉴) 권한 행을 조회합니다.
    async fn find_access_by_code(
        &self,
        role_id: Uuid,
        menu_code: &str,
    ) -> StoreResult<Option<RoleMenuAccess>>;

    async fn list_access_for_role(&self, role_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>>;

    async fn list_access_for_menu(&self, menu_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>>;

    async fn insert_access(&self, access: &RoleMenuAccess) -> StoreResult<()>;

    async fn update_access(&self, access: &RoleMenuAccess) -> StoreResult<u64>;

    async fn delete_access(&self, id: Uuid) -> StoreResult<u64>;
}

/// 세션 저장소.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 세션을 저장합니다. 사용자별 중복 제거는 하지 않습니다.
    async fn create_session(&self, session: NewSession) -> StoreResult<Session>;

    /// `now` 시점에 만료되지 않은 세션만 찾습니다.
    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>>;

    /// Access Token만 교체합니다. Refresh Token과 만료 시각은 그대로입니다.
    async fn replace_access_token(&self, session_id: Uuid, access_token: &str)
        -> StoreResult<u64>;

    /// 일치하는 세션을 모두 삭제하고 삭제된 행 수를 반환합니다.
    async fn delete_by_user_and_token(&self, user_id: Uuid, access_token: &str)
        -> StoreResult<u64>;

    /// 만료된 세션을 삭제합니다. 외부 정리 작업에서만 호출됩니다.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// 서비스가 사용하는 전체 저장소.
pub trait RbacStore:
    UserStore + RoleStore + MembershipStore + MenuStore + AccessStore + SessionStore
{
}

impl<T> RbacStore for T where
    T: UserStore + RoleStore + MembershipStore + MenuStore + AccessStore + SessionStore
{
}
