//! 메뉴 관리와 메뉴 트리 조회.
//!
//! 구조 변경(생성, 부모 변경, 삭제)은 게이트 안에서 메뉴 스냅샷을 읽고
//! [`MenuGuard`]로 검증한 뒤 기록합니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rbac_core::{
    build_menu_tree, Menu, MenuEntry, MenuGuard, MenuNode, RbacError, RbacResult, Resource,
    RoleMenuAccess,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{double_option, WriteGate};
use crate::store::{AccessStore, MenuStore, RbacStore};

/// 메뉴 생성 입력.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMenu {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// 기본값 0
    #[serde(default)]
    pub order: Option<i32>,
    /// 생략하면 부모 깊이 + 1
    #[serde(default)]
    pub level: Option<i32>,
    /// 기본값 true
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewMenu {
    /// 최소 입력으로 생성합니다.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            parent_id: None,
            name: name.into(),
            code: code.into(),
            url: None,
            icon: None,
            order: None,
            level: None,
            is_active: None,
        }
    }

    /// 부모를 지정합니다.
    pub fn under(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// 정렬 순서를 지정합니다.
    pub fn ordered(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// 메뉴 수정 입력. 메뉴 코드는 변경할 수 없습니다.
///
/// `parent_id`: 생략 = 유지, `null` = 루트로 이동, 값 = 부모 변경.
/// `url`, `icon`도 같은 규칙이며 `null`은 값을 지웁니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// 메뉴 상세: 부모, 직접 자식, 권한 행.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDetail {
    pub menu: Menu,
    pub parent: Option<Menu>,
    pub children: Vec<Menu>,
    pub access: Vec<RoleMenuAccess>,
}

/// 메뉴 서비스.
#[derive(Clone)]
pub struct MenuService {
    store: Arc<dyn RbacStore>,
    gate: Arc<WriteGate>,
}

impl MenuService {
    pub fn new(store: Arc<dyn RbacStore>, gate: Arc<WriteGate>) -> Self {
        Self { store, gate }
    }

    async fn snapshot(&self) -> RbacResult<MenuGuard> {
        Ok(MenuGuard::new(self.store.list_menus().await?))
    }

    /// 메뉴를 생성합니다.
    #[instrument(skip(self, input), fields(code = %input.code, parent_id = ?input.parent_id))]
    pub async fn create(&self, input: NewMenu) -> RbacResult<Menu> {
        let _guard = self.gate.enter().await;
        let snapshot = self.snapshot().await?;

        let level = snapshot.check_create(&input.code, input.parent_id, input.level)?;

        let mut menu = Menu::new(input.name, input.code);
        menu.parent_id = input.parent_id;
        menu.url = input.url;
        menu.icon = input.icon;
        menu.order = input.order.unwrap_or(0);
        menu.level = level;
        menu.is_active = input.is_active.unwrap_or(true);

        let code = menu.code.clone();
        self.store
            .insert_menu(&menu)
            .await
            .map_err(|e| e.or_conflict(RbacError::DuplicateCode(code)))?;

        info!(menu_id = %menu.id, level = menu.level, "Menu created");
        Ok(menu)
    }

    /// 메뉴를 수정합니다. 부모가 주어지면 순환 여부를 검사합니다.
    #[instrument(skip(self, patch), fields(parent_id = ?patch.parent_id))]
    pub async fn update(&self, id: Uuid, patch: MenuPatch) -> RbacResult<Menu> {
        let _guard = self.gate.enter().await;
        let snapshot = self.snapshot().await?;

        let mut menu = snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| RbacError::not_found(Resource::Menu, id))?;

        if let Some(parent_id) = patch.parent_id {
            snapshot.check_reparent(id, parent_id)?;
            if menu.parent_id != parent_id {
                info!(menu_id = %id, from = ?menu.parent_id, to = ?parent_id, "Menu reparented");
            }
            menu.parent_id = parent_id;
        }
        if let Some(name) = patch.name {
            menu.name = name;
        }
        if let Some(url) = patch.url {
            menu.url = url;
        }
        if let Some(icon) = patch.icon {
            menu.icon = icon;
        }
        if let Some(order) = patch.order {
            menu.order = order;
        }
        if let Some(level) = patch.level {
            menu.level = level;
        }
        if let Some(is_active) = patch.is_active {
            menu.is_active = is_active;
        }
        menu.updated_at = Utc::now();

        self.store.update_menu(&menu).await?;

        debug!(menu_id = %id, "Menu updated");
        Ok(menu)
    }

    /// 메뉴를 삭제합니다. 자식이 있으면 거부하고, 권한 행은 함께 삭제됩니다.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let _guard = self.gate.enter().await;
        let snapshot = self.snapshot().await?;

        snapshot.check_delete(id)?;
        self.store.delete_menu(id).await?;

        info!(menu_id = %id, "Menu deleted");
        Ok(())
    }

    /// 메뉴 상세를 조회합니다.
    pub async fn find(&self, id: Uuid) -> RbacResult<MenuDetail> {
        let snapshot = self.snapshot().await?;
        let menu = snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| RbacError::not_found(Resource::Menu, id))?;

        let parent = menu.parent_id.and_then(|p| snapshot.get(p)).cloned();
        let children = snapshot.children_of(id).into_iter().cloned().collect();
        let access = self.store.list_access_for_menu(id).await?;

        Ok(MenuDetail {
            menu,
            parent,
            children,
            access,
        })
    }

    /// 전체 메뉴 트리. 비활성 메뉴(와 그 하위)는 기본적으로 제외됩니다.
    #[instrument(skip(self))]
    pub async fn tree(&self, include_inactive: bool) -> RbacResult<Vec<MenuNode>> {
        let entries: Vec<MenuEntry> = self
            .store
            .list_menus()
            .await?
            .into_iter()
            .filter(|m| include_inactive || m.is_active)
            .map(MenuEntry::from)
            .collect();

        Ok(build_menu_tree(&entries, None))
    }

    /// 역할이 조회 권한을 가진 활성 메뉴의 트리. 각 노드에 권한 4종이 붙습니다.
    ///
    /// 조회 권한이 없는 메뉴의 하위 메뉴는 자체 권한이 있어도 나타나지 않습니다.
    #[instrument(skip(self))]
    pub async fn accessible_tree(&self, user_id: Uuid, role_id: Uuid) -> RbacResult<Vec<MenuNode>> {
        let permissions: HashMap<Uuid, _> = self
            .store
            .list_access_for_role(role_id)
            .await?
            .into_iter()
            .map(|a| (a.menu_id, a.permissions))
            .collect();

        let entries: Vec<MenuEntry> = self
            .store
            .list_menus()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .filter_map(|menu| {
                let perms = permissions.get(&menu.id).copied()?;
                perms.can_view.then_some(MenuEntry {
                    menu,
                    permissions: Some(perms),
                })
            })
            .collect();

        let tree = build_menu_tree(&entries, None);
        debug!(visible = entries.len(), roots = tree.len(), "Accessible menu tree built");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> MenuService {
        MenuService::new(Arc::new(MemoryStore::new()), Arc::new(WriteGate::new()))
    }

    #[tokio::test]
    async fn test_create_derives_level_and_defaults() {
        let menus = service();
        let root = menus.create(NewMenu::new("Users", "USER_MGMT")).await.unwrap();
        let child = menus
            .create(NewMenu::new("User List", "USER_LIST").under(root.id))
            .await
            .unwrap();

        assert_eq!(root.level, 1);
        assert_eq!(root.order, 0);
        assert!(root.is_active);
        assert_eq!(child.level, 2);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let menus = service();
        menus.create(NewMenu::new("Dashboard", "DASHBOARD")).await.unwrap();
        assert!(matches!(
            menus.create(NewMenu::new("Dash 2", "DASHBOARD")).await,
            Err(RbacError::DuplicateCode(code)) if code == "DASHBOARD"
        ));
    }

    #[tokio::test]
    async fn test_move_to_root_and_keep_level() {
        let menus = service();
        let a = menus.create(NewMenu::new("A", "A")).await.unwrap();
        let b = menus.create(NewMenu::new("B", "B").under(a.id)).await.unwrap();

        let moved = menus
            .update(
                b.id,
                MenuPatch {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(moved.is_root());
        // level은 명시할 때만 바뀜
        assert_eq!(moved.level, 2);
    }

    #[tokio::test]
    async fn test_patch_without_parent_keeps_parent() {
        let menus = service();
        let a = menus.create(NewMenu::new("A", "A")).await.unwrap();
        let b = menus.create(NewMenu::new("B", "B").under(a.id)).await.unwrap();

        let renamed = menus
            .update(
                b.id,
                MenuPatch {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.parent_id, Some(a.id));
        assert_eq!(renamed.name, "Renamed");
    }

    #[tokio::test]
    async fn test_find_detail() {
        let menus = service();
        let a = menus.create(NewMenu::new("A", "A")).await.unwrap();
        menus.create(NewMenu::new("C", "C").under(a.id).ordered(2)).await.unwrap();
        let b = menus.create(NewMenu::new("B", "B").under(a.id).ordered(1)).await.unwrap();

        let detail = menus.find(a.id).await.unwrap();
        let codes: Vec<_> = detail.children.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["B", "C"]);
        assert!(detail.parent.is_none());

        let detail = menus.find(b.id).await.unwrap();
        assert_eq!(detail.parent.map(|p| p.id), Some(a.id));
    }

    #[tokio::test]
    async fn test_inactive_subtree_hidden() {
        let menus = service();
        let a = menus.create(NewMenu::new("A", "A")).await.unwrap();
        menus.create(NewMenu::new("B", "B").under(a.id)).await.unwrap();
        menus
            .update(
                a.id,
                MenuPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(menus.tree(false).await.unwrap().is_empty());
        let full = menus.tree(true).await.unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].count(), 2);
    }

    #[test]
    fn test_patch_parent_tri_state() {
        let omitted: MenuPatch = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert_eq!(omitted.parent_id, None);

        let null: MenuPatch = serde_json::from_str(r#"{"parentId":null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));

        let id = Uuid::new_v4();
        let set: MenuPatch = serde_json::from_str(&format!(r#"{{"parentId":"{}"}}"#, id)).unwrap();
        assert_eq!(set.parent_id, Some(Some(id)));

        let cleared: MenuPatch = serde_json::from_str(r#"{"url":null,"icon":"home"}"#).unwrap();
        assert_eq!(cleared.url, Some(None));
        assert_eq!(cleared.icon, Some(Some("home".to_string())));
    }

    #[tokio::test]
    async fn test_update_clears_url_and_icon() {
        let menus = service();
        let mut input = NewMenu::new("Dashboard", "DASHBOARD");
        input.url = Some("/dashboard".to_string());
        input.icon = Some("home".to_string());
        let menu = menus.create(input).await.unwrap();

        let patch: MenuPatch = serde_json::from_str(r#"{"url":null,"icon":null}"#).unwrap();
        let updated = menus.update(menu.id, patch).await.unwrap();
        assert_eq!(updated.url, None);
        assert_eq!(updated.icon, None);

        // 생략한 필드는 유지
        let patch = MenuPatch {
            url: Some(Some("/home".to_string())),
            ..Default::default()
        };
        menus.update(menu.id, patch).await.unwrap();
        let stored = menus.find(menu.id).await.unwrap().menu;
        assert_eq!(stored.url.as_deref(), Some("/home"));
        assert_eq!(stored.icon, None);
        assert_eq!(stored.name, "Dashboard");
    }
}
