//! `login`, `logout` and `whoami`.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::auth::User;
use crate::session::{Backend, Session};
use crate::traits::CredentialKey;

use super::report;

/// Restore the stored session or explain how to create one.
pub async fn require_session(backend: &Backend) -> Result<Session> {
    match Session::restore(backend).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(eyre!(
            "Not signed in. Run `geoarchive login <username>` first."
        )),
        Err(e) => Err(report(e)).wrap_err("Failed to restore session"),
    }
}

pub async fn handle_login(backend: &Backend, username: &str) -> Result<()> {
    let password = tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
        .await
        .wrap_err("Password prompt failed")?
        .wrap_err("Failed to read password")?;

    let session = Session::login(backend, username, &password)
        .await
        .map_err(report)?;

    match session.current_user() {
        Some(user) => println!("Signed in as {}", describe_user(&user)),
        None => println!("Signed in"),
    }
    Ok(())
}

pub async fn handle_logout(backend: &Backend) -> Result<()> {
    match Session::restore(backend).await {
        Ok(Some(session)) => {
            session.logout().await.map_err(report)?;
            println!("Signed out");
        }
        Ok(None) => println!("Not signed in"),
        Err(e) => {
            // Unreadable credentials: nothing to keep, start over.
            tracing::warn!("{}", e);
            for key in CredentialKey::ALL {
                backend
                    .store
                    .delete(key)
                    .await
                    .wrap_err("Failed to wipe stored credentials")?;
            }
            println!("Signed out");
        }
    }
    Ok(())
}

pub async fn handle_whoami(backend: &Backend) -> Result<()> {
    let session = require_session(backend).await?;
    match session.refresh_user().await {
        Ok(user) => println!("{}", describe_user(&user)),
        Err(e) if e.requires_reauth() => return Err(report(e)),
        Err(e) => match session.current_user() {
            Some(user) => {
                println!("{} (offline: {})", describe_user(&user), e.user_message());
            }
            None => return Err(report(e)),
        },
    }
    Ok(())
}

pub fn describe_user(user: &User) -> String {
    let mut line = user.username.clone();
    if let Some(email) = &user.email {
        line.push_str(&format!(" <{}>", email));
    }
    if user.is_admin {
        line.push_str(" [admin]");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_user() {
        let mut user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: None,
            is_admin: false,
        };
        assert_eq!(describe_user(&user), "alice");

        user.email = Some("alice@example.com".to_string());
        user.is_admin = true;
        assert_eq!(describe_user(&user), "alice <alice@example.com> [admin]");
    }
}
