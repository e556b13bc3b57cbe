//! 역할-메뉴 권한 매트릭스.
//!
//! 권한은 (역할, 메뉴, 액션) 3-튜플 조회입니다. 표현식 기반 정책은
//! 지원하지 않습니다. 행이 없으면 거부하고(default-deny), 부모 메뉴의
//! 권한은 자식에게 상속되지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 메뉴에 대해 수행할 수 있는 액션.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// 조회
    View,
    /// 생성
    Create,
    /// 수정
    Update,
    /// 삭제
    Delete,
}

impl Action {
    /// 모든 액션.
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

    /// 소문자 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(Action::View),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// CRUD 권한 4종 플래그.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_view: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl Permissions {
    /// 모든 권한.
    pub const fn full() -> Self {
        Self {
            can_view: true,
            can_create: true,
            can_update: true,
            can_delete: true,
        }
    }

    /// 조회 전용.
    pub const fn view_only() -> Self {
        Self {
            can_view: true,
            can_create: false,
            can_update: false,
            can_delete: false,
        }
    }

    /// 액션이 허용되는지 확인합니다.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Update => self.can_update,
            Action::Delete => self.can_delete,
        }
    }
}

/// 역할-메뉴 권한 행. (역할, 메뉴) 쌍당 최대 하나입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMenuAccess {
    pub id: Uuid,
    pub role_id: Uuid,
    pub menu_id: Uuid,
    #[serde(flatten)]
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleMenuAccess {
    /// 새 권한 행을 생성합니다.
    pub fn new(role_id: Uuid, menu_id: Uuid, permissions: Permissions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            role_id,
            menu_id,
            permissions,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 권한 행 조회 결과로 액션 허용 여부를 결정합니다.
///
/// 행이 없으면 어떤 액션이든 거부합니다.
pub fn evaluate_access(row: Option<&RoleMenuAccess>, action: Action) -> bool {
    row.is_some_and(|access| access.permissions.allows(action))
}
