//! Per-action access, serialization and throttling table.
//!
//! Every endpoint names its `Action`; the request guard looks up the
//! permission and throttle scope here before any business logic runs, and
//! handlers pick the response shape from the same row.

use crate::throttle::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ProfessionalList,
    ProfessionalRetrieve,
    ProfessionalCreate,
    ProfessionalUpdate,
    ProfessionalDelete,
    AppointmentList,
    AppointmentRetrieve,
    AppointmentCreate,
    AppointmentUpdate,
    AppointmentDelete,
    Register,
    Login,
    Logout,
    ProfileRead,
    ProfileUpdate,
    TokenRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Public,
    Authenticated,
}

/// Which serializer renders the action's response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Full professional record with display name
    Professional,
    /// Appointment as stored, referencing its professional by id
    AppointmentSummary,
    /// Appointment with the professional's name and specialty inlined
    AppointmentDetail,
    /// Account payloads (tokens, profile) or empty bodies
    Account,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    pub permission: Permission,
    pub shape: Shape,
    pub scope: Option<Scope>,
}

impl Action {
    pub const ALL: [Action; 16] = [
        Action::ProfessionalList,
        Action::ProfessionalRetrieve,
        Action::ProfessionalCreate,
        Action::ProfessionalUpdate,
        Action::ProfessionalDelete,
        Action::AppointmentList,
        Action::AppointmentRetrieve,
        Action::AppointmentCreate,
        Action::AppointmentUpdate,
        Action::AppointmentDelete,
        Action::Register,
        Action::Login,
        Action::Logout,
        Action::ProfileRead,
        Action::ProfileUpdate,
        Action::TokenRefresh,
    ];

    pub const fn policy(self) -> ActionPolicy {
        use Permission::*;
        use Shape::*;

        let (permission, shape, scope) = match self {
            Action::ProfessionalList => (Public, Professional, Some(Scope::Listing)),
            Action::ProfessionalRetrieve => (Public, Professional, None),
            Action::ProfessionalCreate => (Authenticated, Professional, Some(Scope::ProfissionalCreate)),
            Action::ProfessionalUpdate => (Authenticated, Professional, Some(Scope::ProfissionalCreate)),
            Action::ProfessionalDelete => (Authenticated, Empty, None),
            Action::AppointmentList => (Public, AppointmentSummary, Some(Scope::Listing)),
            Action::AppointmentRetrieve => (Public, AppointmentDetail, None),
            Action::AppointmentCreate => (Authenticated, AppointmentSummary, Some(Scope::ConsultaCreate)),
            Action::AppointmentUpdate => (Authenticated, AppointmentSummary, Some(Scope::ConsultaCreate)),
            Action::AppointmentDelete => (Authenticated, Empty, None),
            Action::Register => (Public, Account, Some(Scope::Registration)),
            Action::Login => (Public, Account, Some(Scope::Login)),
            Action::Logout => (Authenticated, Account, Some(Scope::SensitiveData)),
            Action::ProfileRead => (Authenticated, Account, Some(Scope::SensitiveData)),
            Action::ProfileUpdate => (Authenticated, Account, Some(Scope::SensitiveData)),
            Action::TokenRefresh => (Public, Account, Some(Scope::Login)),
        };

        ActionPolicy { permission, shape, scope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_public_and_writes_authenticated() {
        for action in [Action::ProfessionalList, Action::ProfessionalRetrieve, Action::AppointmentList, Action::AppointmentRetrieve] {
            assert_eq!(action.policy().permission, Permission::Public, "{:?}", action);
        }
        for action in [
            Action::ProfessionalCreate,
            Action::ProfessionalUpdate,
            Action::ProfessionalDelete,
            Action::AppointmentCreate,
            Action::AppointmentUpdate,
            Action::AppointmentDelete,
        ] {
            assert_eq!(action.policy().permission, Permission::Authenticated, "{:?}", action);
        }
    }

    #[test]
    fn list_actions_use_listing_scope() {
        assert_eq!(Action::ProfessionalList.policy().scope, Some(Scope::Listing));
        assert_eq!(Action::AppointmentList.policy().scope, Some(Scope::Listing));
    }

    #[test]
    fn writes_use_resource_create_scopes() {
        assert_eq!(Action::AppointmentCreate.policy().scope, Some(Scope::ConsultaCreate));
        assert_eq!(Action::AppointmentUpdate.policy().scope, Some(Scope::ConsultaCreate));
        assert_eq!(Action::ProfessionalCreate.policy().scope, Some(Scope::ProfissionalCreate));
        assert_eq!(Action::ProfessionalUpdate.policy().scope, Some(Scope::ProfissionalCreate));
    }

    #[test]
    fn auth_endpoints_have_their_own_scopes() {
        assert_eq!(Action::Login.policy().scope, Some(Scope::Login));
        assert_eq!(Action::Register.policy().scope, Some(Scope::Registration));
        assert_eq!(Action::ProfileRead.policy().scope, Some(Scope::SensitiveData));
    }

    #[test]
    fn retrieve_shapes_differ_for_appointments() {
        assert_eq!(Action::AppointmentRetrieve.policy().shape, Shape::AppointmentDetail);
        assert_eq!(Action::AppointmentList.policy().shape, Shape::AppointmentSummary);
        assert!(Action::ALL.iter().all(|a| a.policy().shape != Shape::Empty
            || matches!(a, Action::ProfessionalDelete | Action::AppointmentDelete)));
    }
}
