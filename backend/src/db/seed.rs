//! Startup seeding
//!
//! Each step only runs when its table is empty, so seeding is safe on
//! every start. Demo accounts are created outside production only.

use anyhow::Result;
use chatmentor_shared::Role;
use tracing::info;
use uuid::Uuid;

use crate::auth::PasswordService;
use crate::repositories::{NewUser, TagStore, UserStore};

/// Tags every installation starts with
pub const DEFAULT_TAGS: [&str; 3] = ["AI", "Software Engineering", "Cybersecurity"];

/// Password given to the demo accounts
pub const DEMO_PASSWORD: &str = "ChangeMe123!";

struct DemoUser {
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
    role: Role,
}

const DEMO_USERS: [DemoUser; 2] = [
    DemoUser {
        first_name: "Alice",
        last_name: "Doe",
        email: "alice@example.com",
        role: Role::Student,
    },
    DemoUser {
        first_name: "Dr. Bob",
        last_name: "Smith",
        email: "bob@example.com",
        role: Role::Mentor,
    },
];

/// Seed tags, and with `include_demo_users` the demo accounts plus one
/// tag assignment
pub async fn seed(
    users: &dyn UserStore,
    tags: &dyn TagStore,
    include_demo_users: bool,
) -> Result<()> {
    if include_demo_users && users.count().await? == 0 {
        let password_hash = PasswordService::hash_async(DEMO_PASSWORD.to_string()).await?;
        for demo in &DEMO_USERS {
            users
                .create(NewUser {
                    user_id: Uuid::new_v4(),
                    first_name: demo.first_name.to_string(),
                    last_name: demo.last_name.to_string(),
                    email: demo.email.to_string(),
                    headline: None,
                    bio: None,
                    profile_picture_url: None,
                    password_hash: password_hash.clone(),
                    role: demo.role,
                })
                .await?;
        }
        info!(count = DEMO_USERS.len(), "seeded demo users");
    }

    if tags.count().await? == 0 {
        for name in DEFAULT_TAGS {
            tags.ensure(name).await?;
        }
        info!(count = DEFAULT_TAGS.len(), "seeded tags");
    }

    if include_demo_users {
        let alice = users.find_by_email("alice@example.com").await?;
        let tag = tags
            .list()
            .await?
            .into_iter()
            .find(|t| t.name == "Software Engineering");

        if let (Some(alice), Some(tag)) = (alice, tag) {
            if tags.list_for_user(alice.id).await?.is_empty() && tags.assign(alice.id, tag.id).await? {
                info!(user_id = %alice.user_id, tag = %tag.name, "seeded user tag");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();

        seed(&store, &store, true).await.unwrap();
        seed(&store, &store, true).await.unwrap();

        assert_eq!(UserStore::count(&store).await.unwrap(), 2);
        assert_eq!(TagStore::count(&store).await.unwrap(), 3);

        let alice = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        let alice_tags = store.list_for_user(alice.id).await.unwrap();
        assert_eq!(alice_tags.len(), 1);
        assert_eq!(alice_tags[0].name, "Software Engineering");
        assert!(PasswordService::verify(DEMO_PASSWORD, &alice.password_hash));

        let bob = store.find_by_email("bob@example.com").await.unwrap().unwrap();
        assert_eq!(bob.role, Role::Mentor);
        assert_eq!(bob.full_name(), "Dr. Bob Smith");
    }

    #[tokio::test]
    async fn test_production_seed_skips_demo_users() {
        let store = MemoryStore::new();

        seed(&store, &store, false).await.unwrap();

        assert_eq!(UserStore::count(&store).await.unwrap(), 0);
        assert_eq!(TagStore::count(&store).await.unwrap(), 3);
    }
}
