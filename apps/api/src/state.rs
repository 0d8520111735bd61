use nutrack_application::{
    AuthorizationGate, CredentialService, RoleAdminService, UserService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_gate: AuthorizationGate,
    pub credential_service: CredentialService,
    pub role_admin_service: RoleAdminService,
    pub user_service: UserService,
    pub frontend_url: String,
}
