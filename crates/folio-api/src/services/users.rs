//! User administration

use super::non_empty;
use crate::auth::password::{hash_password_with_config, validate_password_strength, PasswordConfig};
use crate::auth::roles::RoleService;
use folio_core::{
    Filter, FolioError, NewUser, Page, Result, Role, User, UserId, UserRepository, UserStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Sortable user columns
pub const USER_ORDER_FIELDS: &[&str] = &["id", "email", "fullname", "phone", "status", "last_access_at"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub fullname: String,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: String,
    pub avatar: Option<String>,
    pub status: Option<String>,
    /// Role slugs; unknown ones are ignored
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial update; blank fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    pub password: Option<String>,
    #[validate(length(max = 255))]
    pub fullname: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub avatar: Option<String>,
    /// Replaces the role set when non-empty
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

/// A user with its assigned roles
#[derive(Debug, Clone)]
pub struct UserDetail {
    pub user: User,
    pub roles: Vec<Role>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    roles: RoleService,
    password: PasswordConfig,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, roles: RoleService, password: PasswordConfig) -> Self {
        Self {
            users,
            roles,
            password,
        }
    }

    async fn detail(&self, user: User) -> Result<UserDetail> {
        let roles = self.roles.roles_for_principal(user.id).await?;
        Ok(UserDetail { user, roles })
    }

    async fn find(&self, id: UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::NotFound("User".to_string()))
    }

    fn hash(&self, password: &str) -> Result<String> {
        validate_password_strength(password).map_err(FolioError::ValidationFailed)?;
        hash_password_with_config(password, &self.password).map_err(|e| FolioError::Other(e.into()))
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<UserId>) -> Result<()> {
        match self.users.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => Err(FolioError::ValidationFailed(
                "User with the given email address already exists".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub async fn list(&self, filter: &Filter) -> Result<Page<UserDetail>> {
        let page = self.users.list(filter).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for user in page.items {
            items.push(self.detail(user).await?);
        }
        Ok(Page {
            items,
            total: page.total,
        })
    }

    pub async fn get(&self, id: UserId) -> Result<UserDetail> {
        let user = self.find(id).await?;
        self.detail(user).await
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<UserDetail> {
        let email = request.email.trim().to_lowercase();
        self.ensure_email_free(&email, None).await?;

        let status = match non_empty(request.status) {
            Some(s) => s.parse::<UserStatus>()?,
            None => UserStatus::Active,
        };

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash: self.hash(&request.password)?,
                fullname: request.fullname,
                phone: request.phone,
                avatar: non_empty(request.avatar),
                status,
            })
            .await?;

        self.roles.sync_roles(user.id, &request.roles).await?;
        self.detail(user).await
    }

    pub async fn update(&self, id: UserId, request: UpdateUserRequest) -> Result<UserDetail> {
        let mut user = self.find(id).await?;

        if let Some(email) = non_empty(request.email) {
            let email = email.trim().to_lowercase();
            self.ensure_email_free(&email, Some(id)).await?;
            user.email = email;
        }
        if let Some(password) = non_empty(request.password) {
            user.password_hash = self.hash(&password)?;
        }
        if let Some(fullname) = non_empty(request.fullname) {
            user.fullname = fullname;
        }
        if let Some(phone) = non_empty(request.phone) {
            user.phone = phone;
        }
        if let Some(avatar) = non_empty(request.avatar) {
            user.avatar = Some(avatar);
        }

        self.users.update(&user).await?;

        if !request.roles.is_empty() {
            self.roles.sync_roles(id, &request.roles).await?;
        }

        self.get(id).await
    }

    pub async fn set_status(&self, id: UserId, status: UserStatus) -> Result<UserDetail> {
        let mut user = self.find(id).await?;
        user.set_status(status);
        self.users.update(&user).await?;
        self.get(id).await
    }

    /// Clear the user's roles, then delete the record
    pub async fn delete(&self, id: UserId) -> Result<()> {
        self.find(id).await?;
        self.roles.sync_roles::<&str>(id, &[]).await?;
        self.users.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::RoleSlug;
    use folio_store::MemoryStore;

    fn service() -> UserService {
        let store = Arc::new(MemoryStore::new());
        UserService::new(
            store.clone(),
            RoleService::new(store),
            PasswordConfig::insecure_fast(),
        )
    }

    fn create_request(email: &str, roles: &[&str]) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: "Secret123".to_string(),
            fullname: "Someone".to_string(),
            phone: "0100000000".to_string(),
            avatar: None,
            status: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_syncs_roles() {
        let service = service();
        let detail = service
            .create(create_request("Admin@Example.com", &["admin", "bogus", "member"]))
            .await
            .unwrap();

        assert_eq!(detail.user.email, "admin@example.com");
        let slugs: Vec<RoleSlug> = detail.roles.iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec![RoleSlug::Admin, RoleSlug::Member]);
    }

    #[tokio::test]
    async fn test_update_skips_blank_fields_and_empty_roles() {
        let service = service();
        let created = service
            .create(create_request("keep@example.com", &["moderator"]))
            .await
            .unwrap();

        let updated = service
            .update(
                created.user.id,
                UpdateUserRequest {
                    fullname: Some("Renamed".to_string()),
                    phone: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.user.fullname, "Renamed");
        assert_eq!(updated.user.phone, "0100000000");
        assert_eq!(updated.roles.len(), 1);
        assert_eq!(updated.roles[0].slug, RoleSlug::Moderator);
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let service = service();
        service.create(create_request("one@example.com", &[])).await.unwrap();
        let two = service.create(create_request("two@example.com", &[])).await.unwrap();

        let result = service
            .update(
                two.user.id,
                UpdateUserRequest {
                    email: Some("ONE@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(FolioError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let service = service();
        let id = service
            .create(create_request("status@example.com", &[]))
            .await
            .unwrap()
            .user
            .id;

        let blocked = service.set_status(id, UserStatus::Blocked).await.unwrap();
        assert!(blocked.user.blocked_at.is_some());

        let active = service.set_status(id, UserStatus::Active).await.unwrap();
        assert!(active.user.blocked_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let service = service();
        let id = service
            .create(create_request("gone@example.com", &["member"]))
            .await
            .unwrap()
            .user
            .id;

        service.delete(id).await.unwrap();

        assert!(matches!(service.get(id).await, Err(FolioError::NotFound(_))));
        assert!(matches!(service.delete(id).await, Err(FolioError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_includes_roles() {
        let service = service();
        service.create(create_request("a@example.com", &["admin"])).await.unwrap();
        service.create(create_request("b@example.com", &[])).await.unwrap();

        let filter = Filter::new(None, None, None, Some("email"), USER_ORDER_FIELDS);
        let page = service.list(&filter).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].user.email, "a@example.com");
        assert_eq!(page.items[0].roles.len(), 1);
        assert!(page.items[1].roles.is_empty());
    }
}
