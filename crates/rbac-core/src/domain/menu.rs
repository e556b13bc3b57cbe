//! 메뉴 엔티티.
//!
//! 메뉴 계층은 부모 역참조(`parent_id`)를 가진 평평한 레코드로 저장됩니다.
//! 트리 연산은 ID 인덱스 위의 알고리즘으로 구현하며, 자식 포인터를
//! 엔티티에 내장하지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 루트 메뉴의 깊이.
pub const ROOT_LEVEL: i32 = 1;

/// 권한이 적용되는 내비게이션/액션 트리의 노드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    /// 메뉴 ID
    pub id: Uuid,
    /// 부모 메뉴 ID (루트면 None)
    pub parent_id: Option<Uuid>,
    /// 메뉴 이름
    pub name: String,
    /// 전역 고유 메뉴 코드 (생성 후 변경 불가)
    pub code: String,
    /// 프론트엔드 경로
    pub url: Option<String>,
    /// 아이콘 이름
    pub icon: Option<String>,
    /// 형제 간 정렬 키
    pub order: i32,
    /// 깊이 (루트 = 1)
    pub level: i32,
    /// 활성 상태
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    /// 새 루트 메뉴를 생성합니다.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            name: name.into(),
            code: code.into(),
            url: None,
            icon: None,
            order: 0,
            level: ROOT_LEVEL,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 부모와 깊이를 설정합니다.
    pub fn with_parent(mut self, parent_id: Uuid, level: i32) -> Self {
        self.parent_id = Some(parent_id);
        self.level = level;
        self
    }

    /// 정렬 순서를 설정합니다.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 경로와 아이콘을 설정합니다.
    pub fn with_link(mut self, url: impl Into<String>, icon: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.icon = Some(icon.into());
        self
    }

    /// 루트 메뉴인지 확인합니다.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
