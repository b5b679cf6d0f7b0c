use uuid::Uuid;

/// Identity of the signed-in caller, resolved per request from the bearer token
/// and handed to whatever needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Present on routes that can be used signed out; `None` means anonymous.
#[derive(Clone, Debug, Default)]
pub struct MaybeSession(pub Option<Session>);
