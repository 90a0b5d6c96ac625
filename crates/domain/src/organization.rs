use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use staffguard_core::{NonEmptyString, StaffId, TenantId, VendorId};

use crate::RoleId;

staffguard_core::uuid_identifier!(
    /// Unique identifier for a department.
    DepartmentId
);

staffguard_core::uuid_identifier!(
    /// Unique identifier for a team.
    TeamId
);

/// Node in a tenant's department tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Stable identifier.
    pub department_id: DepartmentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning vendor, absent for tenant-wide departments.
    pub vendor_id: Option<VendorId>,
    /// Display name.
    pub name: NonEmptyString,
    /// Optional short code.
    pub code: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Parent department, absent for roots.
    pub parent_department_id: Option<DepartmentId>,
    /// Optional department head.
    pub head_staff_id: Option<StaffId>,
    /// Deleted departments are deactivated.
    pub is_active: bool,
}

/// Team attached to exactly one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable identifier.
    pub team_id: TeamId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning vendor, absent for tenant-wide teams.
    pub vendor_id: Option<VendorId>,
    /// Parent department.
    pub department_id: DepartmentId,
    /// Display name.
    pub name: NonEmptyString,
    /// Optional short code.
    pub code: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional team lead.
    pub team_lead_id: Option<StaffId>,
    /// Role members of the team are expected to hold.
    pub default_role_id: Option<RoleId>,
    /// Optional member cap.
    pub max_capacity: Option<u32>,
    /// Deleted teams are deactivated.
    pub is_active: bool,
}

/// Partial department update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentUpdate {
    /// New name.
    pub name: Option<NonEmptyString>,
    /// New code; `Some(None)` clears it.
    pub code: Option<Option<String>>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New parent; `Some(None)` makes the department a root.
    pub parent_department_id: Option<Option<DepartmentId>>,
    /// New head; `Some(None)` clears it.
    pub head_staff_id: Option<Option<StaffId>>,
}

impl Department {
    /// Returns the department with `update` applied.
    #[must_use]
    pub fn with_update(&self, update: DepartmentUpdate) -> Self {
        let mut updated = self.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(code) = update.code {
            updated.code = code;
        }
        if let Some(description) = update.description {
            updated.description = description;
        }
        if let Some(parent_department_id) = update.parent_department_id {
            updated.parent_department_id = parent_department_id;
        }
        if let Some(head_staff_id) = update.head_staff_id {
            updated.head_staff_id = head_staff_id;
        }
        updated
    }
}

/// Partial team update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamUpdate {
    /// Moves the team to another department.
    pub department_id: Option<DepartmentId>,
    /// New name.
    pub name: Option<NonEmptyString>,
    /// New code; `Some(None)` clears it.
    pub code: Option<Option<String>>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New lead; `Some(None)` clears it.
    pub team_lead_id: Option<Option<StaffId>>,
    /// New default role; `Some(None)` clears it.
    pub default_role_id: Option<Option<RoleId>>,
    /// New capacity; `Some(None)` clears it.
    pub max_capacity: Option<Option<u32>>,
}

impl Team {
    /// Returns the team with `update` applied.
    #[must_use]
    pub fn with_update(&self, update: TeamUpdate) -> Self {
        let mut updated = self.clone();
        if let Some(department_id) = update.department_id {
            updated.department_id = department_id;
        }
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(code) = update.code {
            updated.code = code;
        }
        if let Some(description) = update.description {
            updated.description = description;
        }
        if let Some(team_lead_id) = update.team_lead_id {
            updated.team_lead_id = team_lead_id;
        }
        if let Some(default_role_id) = update.default_role_id {
            updated.default_role_id = default_role_id;
        }
        if let Some(max_capacity) = update.max_capacity {
            updated.max_capacity = max_capacity;
        }
        updated
    }
}

/// Parent relation snapshot used for cycle checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentForest {
    parents: HashMap<DepartmentId, Option<DepartmentId>>,
}

impl DepartmentForest {
    /// Builds a forest from `(department, parent)` pairs.
    #[must_use]
    pub fn from_links(
        links: impl IntoIterator<Item = (DepartmentId, Option<DepartmentId>)>,
    ) -> Self {
        Self {
            parents: links.into_iter().collect(),
        }
    }

    /// Returns whether the department is known.
    #[must_use]
    pub fn contains(&self, department_id: DepartmentId) -> bool {
        self.parents.contains_key(&department_id)
    }

    /// Returns the recorded parent of a department.
    #[must_use]
    pub fn parent_of(&self, department_id: DepartmentId) -> Option<DepartmentId> {
        self.parents.get(&department_id).copied().flatten()
    }

    /// Returns whether making `proposed_parent` the parent of `department_id`
    /// would close a loop.
    ///
    /// Walks up from the proposed parent without recursion. A chain that
    /// revisits a node is reported as a cycle as well, and a chain that ends
    /// at an unknown department is not.
    #[must_use]
    pub fn would_create_cycle(
        &self,
        department_id: DepartmentId,
        proposed_parent: DepartmentId,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(proposed_parent);

        while let Some(node) = current {
            if node == department_id || !visited.insert(node) {
                return true;
            }
            current = self.parent_of(node);
        }

        false
    }
}

/// Department with its visible sub-departments and active teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentHierarchy {
    /// The department at this node.
    pub department: Department,
    /// Child departments, in input order.
    pub sub_departments: Vec<DepartmentHierarchy>,
    /// Active teams attached to this department.
    pub teams: Vec<Team>,
}

impl DepartmentHierarchy {
    /// Assembles the department trees visible in `departments`.
    ///
    /// A department whose parent is not in the set is a root. Nodes caught in
    /// a stored loop are still returned once, under the first of them seen.
    /// Inactive teams and teams of departments outside the set are skipped.
    #[must_use]
    pub fn build(departments: Vec<Department>, teams: Vec<Team>) -> Vec<Self> {
        let forest = DepartmentForest::from_links(
            departments
                .iter()
                .map(|department| (department.department_id, department.parent_department_id)),
        );
        let input_order: Vec<DepartmentId> = departments
            .iter()
            .map(|department| department.department_id)
            .collect();

        let mut children: HashMap<DepartmentId, Vec<DepartmentId>> = HashMap::new();
        let mut starts = Vec::new();
        for department_id in &input_order {
            match forest
                .parent_of(*department_id)
                .filter(|parent| parent != department_id && forest.contains(*parent))
            {
                Some(parent) => children.entry(parent).or_default().push(*department_id),
                None => starts.push(*department_id),
            }
        }
        starts.extend(input_order.iter().copied());

        // Pre-order walk with an explicit stack; reversed, it yields children
        // before their parents.
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(input_order.len());
        let mut tree_children: HashMap<DepartmentId, Vec<DepartmentId>> = HashMap::new();
        let mut roots = Vec::new();
        for start in starts {
            if !visited.insert(start) {
                continue;
            }
            roots.push(start);
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                order.push(node);
                let Some(node_children) = children.get(&node) else {
                    continue;
                };
                for child in node_children {
                    if visited.insert(*child) {
                        tree_children.entry(node).or_default().push(*child);
                    }
                }
                if let Some(linked) = tree_children.get(&node) {
                    stack.extend(linked.iter().rev().copied());
                }
            }
        }

        let mut teams_by_department: HashMap<DepartmentId, Vec<Team>> = HashMap::new();
        for team in teams.into_iter().filter(|team| team.is_active) {
            teams_by_department
                .entry(team.department_id)
                .or_default()
                .push(team);
        }
        let mut pending: HashMap<DepartmentId, Department> = departments
            .into_iter()
            .map(|department| (department.department_id, department))
            .collect();

        let mut built: HashMap<DepartmentId, Self> = HashMap::new();
        for department_id in order.into_iter().rev() {
            let Some(department) = pending.remove(&department_id) else {
                continue;
            };
            let sub_departments = tree_children
                .remove(&department_id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|child| built.remove(&child))
                .collect();
            let teams = teams_by_department
                .remove(&department_id)
                .unwrap_or_default();
            built.insert(
                department_id,
                Self {
                    department,
                    sub_departments,
                    teams,
                },
            );
        }

        roots
            .into_iter()
            .filter_map(|root| built.remove(&root))
            .collect()
    }
}
