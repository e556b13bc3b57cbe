//! 메뉴 구조 변경 검증.
//!
//! 메뉴 스냅샷(ID → 레코드 인덱스) 위에서 생성/부모 변경/삭제가
//! 트리 불변식을 깨지 않는지 검사합니다:
//! - 메뉴 코드 전역 고유
//! - 부모 메뉴 존재
//! - 순환 없음 (어떤 메뉴도 자기 자신의 조상이 아님)
//! - 자식이 있는 메뉴는 삭제 불가 (얕은 삭제만 허용)
//!
//! 검사와 쓰기 사이의 경쟁은 호출자가 직렬화해야 합니다.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::{Menu, ROOT_LEVEL};
use crate::error::{RbacError, RbacResult, Resource};

/// ID로 색인된 메뉴 스냅샷과 구조 검증 규칙.
#[derive(Debug, Clone, Default)]
pub struct MenuGuard {
    menus: HashMap<Uuid, Menu>,
}

impl MenuGuard {
    /// 메뉴 목록으로 스냅샷을 생성합니다.
    pub fn new(menus: impl IntoIterator<Item = Menu>) -> Self {
        Self {
            menus: menus.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// 스냅샷의 메뉴 수.
    pub fn len(&self) -> usize {
        self.menus.len()
    }

    /// 스냅샷이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// ID로 메뉴를 조회합니다.
    pub fn get(&self, id: Uuid) -> Option<&Menu> {
        self.menus.get(&id)
    }

    /// 메뉴 코드가 이미 사용 중인지 확인합니다.
    pub fn code_exists(&self, code: &str) -> bool {
        self.menus.values().any(|m| m.code == code)
    }

    /// 직접 자식 목록 (`order` 오름차순).
    pub fn children_of(&self, id: Uuid) -> Vec<&Menu> {
        let mut children: Vec<&Menu> = self
            .menus
            .values()
            .filter(|m| m.parent_id == Some(id))
            .collect();
        children.sort_by_key(|m| (m.order, m.created_at));
        children
    }

    /// 메뉴를 스냅샷에 반영합니다 (삽입 또는 교체).
    pub fn upsert(&mut self, menu: Menu) {
        self.menus.insert(menu.id, menu);
    }

    /// 메뉴를 스냅샷에서 제거합니다.
    pub fn remove(&mut self, id: Uuid) -> Option<Menu> {
        self.menus.remove(&id)
    }

    /// 생성 검증. 저장할 `level`을 반환합니다.
    ///
    /// `level`이 주어지지 않으면 부모 깊이 + 1 (루트는 1)로 계산합니다.
    pub fn check_create(
        &self,
        code: &str,
        parent_id: Option<Uuid>,
        level: Option<i32>,
    ) -> RbacResult<i32> {
        if self.code_exists(code) {
            return Err(RbacError::DuplicateCode(code.to_string()));
        }

        let derived = match parent_id {
            Some(parent_id) => {
                let parent = self.get(parent_id).ok_or(RbacError::ParentNotFound)?;
                parent.level + 1
            }
            None => ROOT_LEVEL,
        };

        Ok(level.unwrap_or(derived))
    }

    /// 부모 변경 검증.
    ///
    /// 대상 부모의 조상 사슬 전체를 위로 따라가며 변경 대상 메뉴가
    /// 나타나면 순환 참조로 거부합니다. 직계 부모만 확인하면 손자가
    /// 자신의 조부모가 되는 경우를 놓칩니다.
    pub fn check_reparent(&self, menu_id: Uuid, new_parent: Option<Uuid>) -> RbacResult<()> {
        if !self.menus.contains_key(&menu_id) {
            return Err(RbacError::not_found(Resource::Menu, menu_id));
        }

        let Some(parent_id) = new_parent else {
            return Ok(());
        };

        if parent_id == menu_id {
            return Err(RbacError::SelfParent);
        }
        if !self.menus.contains_key(&parent_id) {
            return Err(RbacError::ParentNotFound);
        }

        let mut visited = HashSet::new();
        let mut current = Some(parent_id);
        while let Some(id) = current {
            if id == menu_id {
                return Err(RbacError::CircularReference);
            }
            if !visited.insert(id) {
                // 기존 트리가 이미 순환 상태: 더 이상 구조를 변경하지 않음
                tracing::error!(menu_id = %id, "Menu ancestor chain already contains a cycle");
                return Err(RbacError::CircularReference);
            }
            current = self.get(id).and_then(|m| m.parent_id);
        }

        Ok(())
    }

    /// 삭제 검증.
    pub fn check_delete(&self, menu_id: Uuid) -> RbacResult<()> {
        if !self.menus.contains_key(&menu_id) {
            return Err(RbacError::not_found(Resource::Menu, menu_id));
        }
        if self.menus.values().any(|m| m.parent_id == Some(menu_id)) {
            return Err(RbacError::HasChildren);
        }
        Ok(())
    }

    /// `candidate`가 `ancestor`의 (엄격한) 후손인지 확인합니다.
    pub fn is_descendant(&self, ancestor: Uuid, candidate: Uuid) -> bool {
        self.ancestors(candidate).any(|id| id == ancestor)
    }

    /// 메뉴의 조상 ID를 가까운 순서대로 반환합니다 (자기 자신 제외).
    pub fn ancestors(&self, id: Uuid) -> Ancestors<'_> {
        Ancestors {
            guard: self,
            current: self.get(id).and_then(|m| m.parent_id),
            visited: HashSet::from([id]),
        }
    }
}

/// 부모 포인터를 따라 올라가는 반복자. 같은 노드를 두 번 방문하지 않습니다.
#[derive(Debug)]
pub struct Ancestors<'a> {
    guard: &'a MenuGuard,
    current: Option<Uuid>,
    visited: HashSet<Uuid>,
}

impl Iterator for Ancestors<'_> {
    type Item = Uuid;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.take()?;
        if !self.visited.insert(id) {
            return None;
        }
        self.current = self.guard.get(id).and_then(|m| m.parent_id);
        Some(id)
    }
}
