use chrono::{Duration, Utc};
use uuid::Uuid;

use circulation_server::models::claims::{CallerRights, Rights, UserClaims};

pub const TEST_SECRET: &str = "change-this-secret-in-production";

pub fn claims(lendings: Rights, stats: Rights) -> UserClaims {
    let now = Utc::now();
    UserClaims {
        sub: "librarian@example.org".to_string(),
        user_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        rights: CallerRights { lendings, stats },
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    }
}

pub fn token_for(claims: &UserClaims, secret: &str) -> String {
    claims.create_token(secret).expect("Failed to sign token")
}

pub fn librarian_token(secret: &str) -> String {
    token_for(&claims(Rights::Write, Rights::Read), secret)
}
