//! 평평한 메뉴 레코드를 계층 트리로 변환합니다.
//!
//! 부모 → 자식 인덱스를 먼저 만든 뒤(O(N)) 루트부터 내려가며 노드를
//! 구성합니다. 각 레벨의 형제는 `order` 오름차순으로 정렬되고, 같은
//! `order`는 입력 순서를 유지합니다.
//!
//! 리프 표현: `children`은 항상 `Vec`이며 리프는 빈 벡터입니다.
//! 직렬화 시 빈 `children` 필드는 생략됩니다.
//!
//! 권한 필터링된 입력에서는 도달 가능한 행만 트리에 포함됩니다.
//! 부모가 입력에 없는 메뉴는 루트로 승격되지 않습니다.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Menu, Permissions};

/// 트리 빌더 입력 행. 역할별 트리에서는 권한 4종이 붙습니다.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub menu: Menu,
    pub permissions: Option<Permissions>,
}

impl From<Menu> for MenuEntry {
    fn from(menu: Menu) -> Self {
        Self {
            menu,
            permissions: None,
        }
    }
}

/// 메뉴 트리 노드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: Uuid,
    pub menu_name: String,
    pub menu_code: String,
    pub menu_url: Option<String>,
    pub menu_icon: Option<String>,
    pub menu_order: i32,
    pub menu_level: i32,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    /// 리프 노드인지 확인합니다.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 이 노드를 포함한 서브트리의 노드 수.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuNode::count).sum::<usize>()
    }

    fn from_entry(entry: &MenuEntry, children: Vec<MenuNode>) -> Self {
        let menu = &entry.menu;
        Self {
            id: menu.id,
            menu_name: menu.name.clone(),
            menu_code: menu.code.clone(),
            menu_url: menu.url.clone(),
            menu_icon: menu.icon.clone(),
            menu_order: menu.order,
            menu_level: menu.level,
            is_active: menu.is_active,
            permissions: entry.permissions,
            children,
        }
    }
}

/// `root` 아래의 메뉴 트리를 구성합니다. `None`이면 최상위 메뉴부터 시작합니다.
pub fn build_menu_tree(entries: &[MenuEntry], root: Option<Uuid>) -> Vec<MenuNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<&MenuEntry>> = HashMap::new();
    for entry in entries {
        by_parent.entry(entry.menu.parent_id).or_default().push(entry);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|e| e.menu.order);
    }

    let mut visited = HashSet::new();
    build_level(&by_parent, root, &mut visited)
}

fn build_level(
    by_parent: &HashMap<Option<Uuid>, Vec<&MenuEntry>>,
    parent: Option<Uuid>,
    visited: &mut HashSet<Uuid>,
) -> Vec<MenuNode> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(siblings.len());
    for entry in siblings {
        // 저장소가 손상되어 순환이 있어도 종료하도록 한 번만 방문
        if !visited.insert(entry.menu.id) {
            continue;
        }
        let children = build_level(by_parent, Some(entry.menu.id), visited);
        nodes.push(MenuNode::from_entry(entry, children));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(menus: &[Menu]) -> Vec<MenuEntry> {
        menus.iter().cloned().map(MenuEntry::from).collect()
    }

    #[test]
    fn test_siblings_sorted_by_order() {
        let c = Menu::new("C", "C").with_order(3);
        let a = Menu::new("A", "A").with_order(1);
        let b = Menu::new("B", "B").with_order(2);

        let tree = build_menu_tree(&entries(&[c, a, b]), None);
        let codes: Vec<_> = tree.iter().map(|n| n.menu_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
        assert!(tree.iter().all(MenuNode::is_leaf));
    }

    #[test]
    fn test_nested_children() {
        let users = Menu::new("Users", "USER_MGMT").with_order(2);
        let list = Menu::new("User List", "USER_LIST").with_parent(users.id, 2).with_order(2);
        let invite = Menu::new("Invite", "USER_INVITE").with_parent(users.id, 2).with_order(1);
        let dashboard = Menu::new("Dashboard", "DASHBOARD").with_order(1);

        let tree = build_menu_tree(&entries(&[list, users, dashboard, invite]), None);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].menu_code, "DASHBOARD");
        assert!(tree[0].is_leaf());

        let users_node = &tree[1];
        let child_codes: Vec<_> = users_node.children.iter().map(|n| n.menu_code.as_str()).collect();
        assert_eq!(child_codes, vec!["USER_INVITE", "USER_LIST"]);
        assert_eq!(users_node.count(), 3);
    }

    #[test]
    fn test_subtree_from_given_parent() {
        let root = Menu::new("Root", "ROOT");
        let child = Menu::new("Child", "CHILD").with_parent(root.id, 2);
        let grandchild = Menu::new("Grandchild", "GRANDCHILD").with_parent(child.id, 3);

        let tree = build_menu_tree(&entries(&[root, child.clone(), grandchild]), Some(child.id));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].menu_code, "GRANDCHILD");
    }

    #[test]
    fn test_no_orphan_promotion() {
        // 부모(hidden)가 입력에 없으면 자식도 트리에 나타나지 않음
        let hidden = Menu::new("Hidden", "HIDDEN");
        let child = Menu::new("Child", "CHILD").with_parent(hidden.id, 2);
        let visible = Menu::new("Visible", "VISIBLE");

        let tree = build_menu_tree(&entries(&[child, visible]), None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].menu_code, "VISIBLE");
        assert!(tree[0].is_leaf());
    }

    #[test]
    fn test_permissions_attached() {
        let dashboard = Menu::new("Dashboard", "DASHBOARD");
        let entry = MenuEntry {
            menu: dashboard,
            permissions: Some(Permissions::view_only()),
        };

        let tree = build_menu_tree(&[entry], None);
        assert_eq!(tree[0].permissions, Some(Permissions::view_only()));
    }

    #[test]
    fn test_leaf_serialization_omits_children() {
        let tree = build_menu_tree(&entries(&[Menu::new("A", "A")]), None);
        let json = serde_json::to_value(&tree[0]).unwrap();
        assert!(json.get("children").is_none());
        assert!(json.get("permissions").is_none());
        assert_eq!(json["menuCode"], "A");
    }

    #[test]
    fn test_corrupted_cycle_terminates() {
        let mut a = Menu::new("A", "A");
        let mut b = Menu::new("B", "B");
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);

        // 순환만 있는 입력은 루트가 없으므로 빈 트리
        assert!(build_menu_tree(&entries(&[a.clone(), b.clone()]), None).is_empty());
        // 순환 안쪽에서 시작해도 각 노드는 한 번만 나타남
        let tree = build_menu_tree(&entries(&[a.clone(), b]), Some(a.id));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].menu_code, "B");
        assert_eq!(tree[0].count(), 2);
    }
}
