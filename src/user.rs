//! Users, roles and the flat permission tables that gate fleet operations.

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};

/// An operation class that can be granted to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AddVehicle,
    RemoveVehicle,
    ModifyVehicle,
    AddPort,
    RemovePort,
    ModifyPort,
    AddContainer,
    RemoveContainer,
    ModifyContainer,
    LoadCargo,
    AddManager,
    RemoveManager,
    ModifyUser,
    MoveVehicle,
    RefuelVehicle,
    ManageTrips,
    ViewAll,
    ViewPort,
    ListShips,
    CalculateWeights,
    CalculateFuel,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AddVehicle,
    Permission::RemoveVehicle,
    Permission::ModifyVehicle,
    Permission::AddPort,
    Permission::RemovePort,
    Permission::ModifyPort,
    Permission::AddContainer,
    Permission::RemoveContainer,
    Permission::ModifyContainer,
    Permission::LoadCargo,
    Permission::AddManager,
    Permission::RemoveManager,
    Permission::ModifyUser,
    Permission::MoveVehicle,
    Permission::RefuelVehicle,
    Permission::ManageTrips,
    Permission::ViewAll,
    Permission::ViewPort,
    Permission::ListShips,
    Permission::CalculateWeights,
    Permission::CalculateFuel,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::AddContainer,
    Permission::RemoveContainer,
    Permission::ModifyContainer,
    Permission::LoadCargo,
    Permission::ViewPort,
    Permission::ModifyPort,
    Permission::ListShips,
    Permission::CalculateWeights,
];

/// What a user is allowed to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    SystemAdmin,
    /// Scoped to the single port it manages
    PortManager { port_id: String },
}

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SystemAdmin => ADMIN_PERMISSIONS,
            Role::PortManager { .. } => MANAGER_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Whether the role may act on `port_id`. Admins reach every port.
    pub fn can_access_port(&self, port_id: &str) -> bool {
        match self {
            Role::SystemAdmin => true,
            Role::PortManager { port_id: managed } => managed == port_id,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "System Admin",
            Role::PortManager { .. } => "Port Manager",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    password: String,
    pub role: Role,
}

impl User {
    pub fn new(username: &str, password: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            role,
        }
    }

    pub fn admin(username: &str, password: &str) -> Self {
        Self::new(username, password, Role::SystemAdmin)
    }

    pub fn manager(username: &str, password: &str, port_id: &str) -> Self {
        Self::new(
            username,
            password,
            Role::PortManager {
                port_id: port_id.to_string(),
            },
        )
    }

    /// Plain equality check against the stored password
    pub fn authenticate(&self, password: &str) -> bool {
        self.password == password
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = password.to_string();
    }

    /// The port a manager is scoped to
    pub fn managed_port(&self) -> Option<&str> {
        match &self.role {
            Role::PortManager { port_id } => Some(port_id),
            Role::SystemAdmin => None,
        }
    }
}

/// A logged-in user, detached from the registry so it can be passed
/// alongside `&mut Fleet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::SystemAdmin
    }

    /// Fail with `PermissionDenied` unless the role holds `permission`
    pub fn require(&self, permission: Permission) -> FleetResult<()> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            Err(self.denied(permission))
        }
    }

    /// Like `require`, and additionally scoped to `port_id` for managers
    pub fn require_at(&self, permission: Permission, port_id: &str) -> FleetResult<()> {
        self.require(permission)?;
        if self.role.can_access_port(port_id) {
            Ok(())
        } else {
            Err(self.denied(permission))
        }
    }

    fn denied(&self, permission: Permission) -> FleetError {
        FleetError::PermissionDenied {
            username: self.username.clone(),
            permission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_superset() {
        for p in MANAGER_PERMISSIONS {
            assert!(Role::SystemAdmin.has_permission(*p), "{p:?}");
        }
        assert!(ADMIN_PERMISSIONS.len() > MANAGER_PERMISSIONS.len());
    }

    #[test]
    fn test_manager_permissions() {
        let role = Role::PortManager {
            port_id: "P1".to_string(),
        };
        assert!(role.has_permission(Permission::AddContainer));
        assert!(role.has_permission(Permission::ListShips));
        assert!(!role.has_permission(Permission::AddPort));
        assert!(!role.has_permission(Permission::MoveVehicle));
        assert!(role.can_access_port("P1"));
        assert!(!role.can_access_port("P2"));
    }

    #[test]
    fn test_authenticate() {
        let mut user = User::admin("admin", "admin123");
        assert!(user.authenticate("admin123"));
        assert!(!user.authenticate("admin"));
        user.set_password("s3cret");
        assert!(user.authenticate("s3cret"));
        assert_eq!(user.managed_port(), None);
    }

    #[test]
    fn test_session_scope() {
        let manager = User::manager("mia", "pw", "P1");
        let session = Session::for_user(&manager);
        assert!(!session.is_admin());
        assert!(session.require_at(Permission::AddContainer, "P1").is_ok());
        assert!(matches!(
            session.require_at(Permission::AddContainer, "P2"),
            Err(FleetError::PermissionDenied { .. })
        ));
        assert!(session.require(Permission::RemovePort).is_err());

        let admin = Session::for_user(&User::admin("root", "pw"));
        assert!(admin.require_at(Permission::RemovePort, "anywhere").is_ok());
    }
}
