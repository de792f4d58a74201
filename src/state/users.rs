use anyhow::{Context, Result};
use data_encoding::BASE32_NOPAD;
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rand::RngCore;
use std::time::{Duration, SystemTime};

use crate::models::{Identity, Session, User, UserRole};

use super::{AppState, SESSION_TTL_SECONDS};

impl User {
    /// Caller identity carried through handlers once a session resolves.
    pub fn identity(&self) -> Identity {
        let mut roles = self.roles.clone();
        if !roles.contains(&self.role) {
            roles.insert(0, self.role);
        }
        Identity {
            email: self.email.clone(),
            role: self.role,
            roles,
        }
    }
}

pub async fn find_user(state: &AppState, email: &str) -> Result<Option<User>> {
    state
        .users
        .find_one(doc! { "email": email.trim().to_lowercase() })
        .await
        .map_err(Into::into)
}

pub async fn list_users(state: &AppState) -> Result<Vec<User>> {
    let mut cursor = state.users.find(doc! {}).sort(doc! { "email": 1 }).await?;
    let mut users = Vec::new();
    while let Some(user) = cursor.try_next().await? {
        users.push(user);
    }
    Ok(users)
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    secret: &str,
    role: UserRole,
) -> Result<ObjectId> {
    let email = email.trim().to_lowercase();
    if find_user(state, &email).await?.is_some() {
        anyhow::bail!("user {email} already exists");
    }
    let res = state
        .users
        .insert_one(User {
            id: None,
            email,
            secret: secret.to_string(),
            role,
            roles: vec![role],
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("user insert missing _id")
}

pub async fn create_session(state: &AppState, email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let _ = state
        .sessions
        .delete_many(doc! { "user_email": &email })
        .await;

    let mut token_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut token_bytes);
    let token = BASE32_NOPAD.encode(&token_bytes);

    let expires_at =
        DateTime::from_system_time(SystemTime::now() + Duration::from_secs(SESSION_TTL_SECONDS));

    state
        .sessions
        .insert_one(Session {
            id: None,
            token: token.clone(),
            user_email: email,
            expires_at,
        })
        .await?;

    Ok(token)
}

pub async fn find_user_by_session(state: &AppState, token: &str) -> Result<Option<User>> {
    let Some(session) = state.sessions.find_one(doc! { "token": token }).await? else {
        return Ok(None);
    };
    if session.expires_at.to_system_time() <= SystemTime::now() {
        let _ = state.sessions.delete_one(doc! { "token": token }).await;
        return Ok(None);
    }
    find_user(state, &session.user_email).await
}

pub async fn delete_session(state: &AppState, token: &str) -> Result<()> {
    state.sessions.delete_one(doc! { "token": token }).await?;
    Ok(())
}
