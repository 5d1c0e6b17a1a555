use utoipa::OpenApi;

/// User management API documentation
#[derive(OpenApi)]
#[openapi(
    components(schemas(
        domain_users::UserResponse,
        domain_users::CreateUser,
        domain_users::UpdateUser,
    )),
    tags((name = "users", description = "User management operations"))
)]
pub struct ApiDoc;
