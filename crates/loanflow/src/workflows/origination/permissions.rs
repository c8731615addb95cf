use super::domain::{Actor, Capability, PermissionGrant, Resource, Role};

/// Default grant set assigned when an actor is created with a role.
///
/// Sets are explicit and flat: there is no inheritance between roles, and
/// an actor's effective capabilities are exactly what its grants list says.
pub fn default_grants(role: Role) -> Vec<PermissionGrant> {
    use Capability::{Approve, Create, Delete, Read, Update};

    match role {
        Role::Admin => vec![
            PermissionGrant {
                resource: Resource::Applications,
                actions: vec![Create, Read, Update, Delete, Approve],
            },
            PermissionGrant {
                resource: Resource::Users,
                actions: vec![Create, Read, Update, Delete, Approve],
            },
            PermissionGrant {
                resource: Resource::Reports,
                actions: vec![Create, Read, Update, Delete, Approve],
            },
            PermissionGrant {
                resource: Resource::Settings,
                actions: vec![Create, Read, Update, Delete, Approve],
            },
        ],
        Role::Underwriter => vec![
            PermissionGrant {
                resource: Resource::Applications,
                actions: vec![Read, Update, Approve],
            },
            PermissionGrant {
                resource: Resource::Reports,
                actions: vec![Read],
            },
        ],
        Role::Analyst => vec![
            PermissionGrant {
                resource: Resource::Applications,
                actions: vec![Create, Read, Update],
            },
            PermissionGrant {
                resource: Resource::Reports,
                actions: vec![Read],
            },
        ],
        Role::Viewer => vec![
            PermissionGrant {
                resource: Resource::Applications,
                actions: vec![Read],
            },
            PermissionGrant {
                resource: Resource::Reports,
                actions: vec![Read],
            },
        ],
    }
}

/// Pure capability lookup: a grant matches on equal resource and contained
/// action. Absence of a match is `false`, not an error; inactive actors
/// never match.
pub fn has_permission(actor: &Actor, resource: Resource, action: Capability) -> bool {
    if !actor.is_active {
        return false;
    }

    actor
        .grants
        .iter()
        .any(|grant| grant.resource == resource && grant.actions.contains(&action))
}

/// Review assignment is role-gated rather than grant-gated: only admins and
/// underwriters may take a file, regardless of update grants.
pub fn can_assign_reviews(actor: &Actor) -> bool {
    actor.is_active && matches!(actor.role, Role::Admin | Role::Underwriter)
}
