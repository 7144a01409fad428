use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::types::Uuid;

use crate::error::AppError;

/// Caller identity forwarded by the API gateway. The gateway has already
/// validated the JWT; this service trusts the headers as-is and never
/// re-validates them.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Validation("X-User-Id header is required".to_string()))?
            .parse::<Uuid>()
            .map_err(|_| AppError::Validation("X-User-Id header must be a UUID".to_string()))?;

        let roles = parts
            .headers
            .get("x-user-roles")
            .and_then(|value| value.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();

        Ok(Self { user_id, roles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_header_is_split_and_trimmed() {
        assert_eq!(
            parse_roles("DOCTOR, ADMIN ,nurse"),
            vec!["DOCTOR", "ADMIN", "nurse"]
        );
        assert!(parse_roles("").is_empty());
        assert!(parse_roles(" , ,").is_empty());
    }

    #[test]
    fn role_checks_are_case_insensitive() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            roles: parse_roles("doctor"),
        };
        assert!(ctx.has_role("DOCTOR"));
        assert!(ctx.has_any_role(&["ADMIN", "DOCTOR"]));
        assert!(!ctx.has_any_role(&["ADMIN", "NURSE"]));
    }
}
