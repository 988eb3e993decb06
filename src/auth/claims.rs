use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// JWT payload attached to authenticated requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,  // user ID
    pub role: Role,     // role snapshot at issuance
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
}
