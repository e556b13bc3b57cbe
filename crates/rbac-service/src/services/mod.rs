//! 오케스트레이션 서비스.
//!
//! 서비스는 저장소 포트와 순수 도메인 알고리즘을 조합합니다. 검사 후
//! 쓰기(check-then-write) 순서는 [`WriteGate`]로 프로세스 안에서
//! 직렬화합니다. 프로세스 간 경쟁은 저장소가 막습니다. 고유 제약과 함께
//! 기본 역할 교체, 메뉴 부모 변경은 저장소 변경 연산 안에서 다시 검사됩니다.

use serde::{Deserialize, Deserializer};
use tokio::sync::{Mutex, MutexGuard};

mod auth;
mod directory;
mod menus;
mod permissions;
mod seed;

pub use auth::{
    AuthService, CurrentUser, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest,
    UserProfile,
};
pub use directory::{
    DirectoryService, NewRole, NewUser, RoleAssignment, RolePatch, UserPatch,
};
pub use menus::{MenuDetail, MenuPatch, MenuService, NewMenu};
pub use permissions::{AccessPatch, NewAccess, PermissionService};
pub use seed::{seed_defaults, SeedReport, DEFAULT_ADMIN_PASSWORD};

/// 변경 연산 직렬화 게이트.
#[derive(Debug, Default)]
pub struct WriteGate {
    lock: Mutex<()>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 게이트를 획득합니다. 가드가 살아 있는 동안 다른 변경 연산은 대기합니다.
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// `null`과 필드 생략을 구분하는 역직렬화.
///
/// 생략 → `None`, `null` → `Some(None)`, 값 → `Some(Some(v))`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
