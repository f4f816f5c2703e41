//! Caller identity carried in bearer tokens

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Rights levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rights {
    #[default]
    None = 0,
    Read = 1,
    Write = 2,
}

/// Per-area rights granted to a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerRights {
    #[serde(default)]
    pub lendings: Rights,
    #[serde(default)]
    pub stats: Rights,
}

/// JWT claims issued by the platform identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    /// School the caller belongs to; every query is scoped to it
    pub tenant_id: Uuid,
    pub rights: CallerRights,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn require_read_lendings(&self) -> Result<(), AppError> {
        if self.rights.lendings >= Rights::Read {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to read lendings".to_string()))
        }
    }

    pub fn require_write_lendings(&self) -> Result<(), AppError> {
        if self.rights.lendings >= Rights::Write {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to manage lendings".to_string()))
        }
    }

    pub fn require_read_stats(&self) -> Result<(), AppError> {
        if self.rights.stats >= Rights::Read {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to read statistics".to_string()))
        }
    }
}
