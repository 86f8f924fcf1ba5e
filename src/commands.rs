//! Service wiring and the one-shot `status`, `login` and `logout` commands.

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};

use usagebar_core::credentials::{
    CredentialStore, Credentials, KeyringStore, MemoryStore, ORG_ID_ENV, SESSION_KEY_ENV,
};
use usagebar_core::presentation::{classify, panel_view, PanelView};
use usagebar_core::usage::{RefreshOutcome, UreqTransport, UsageClient, UsageService, UsageSnapshot};

use crate::config::Settings;
use crate::ui::components::StatusLine;

/// Environment credentials when both variables are set, else the keyring
pub fn credential_store() -> Arc<dyn CredentialStore> {
    match Credentials::from_env() {
        Some(credentials) => {
            info!(
                "Using credentials from {} / {}",
                SESSION_KEY_ENV, ORG_ID_ENV
            );
            Arc::new(MemoryStore::holding(credentials))
        }
        None => Arc::new(KeyringStore::new()),
    }
}

/// Build the usage service for `settings`
pub fn build_service(settings: &Settings, store: Arc<dyn CredentialStore>) -> Arc<UsageService> {
    let transport = Arc::new(UreqTransport::new(settings.request_timeout()));
    let client = UsageClient::new(settings.api_root.clone(), transport);
    debug!("Usage client rooted at {}", client.api_root());
    Arc::new(UsageService::new(client, store))
}

/// Fetch once and print the result
pub async fn status(service: &UsageService, json: bool) -> Result<()> {
    let outcome = service.refresh().await;
    let snapshot = service.snapshot();

    match outcome {
        RefreshOutcome::NoCredentials => bail!(
            "No credentials stored; run `usagebar login --org-id <id>` or set {} and {}",
            SESSION_KEY_ENV,
            ORG_ID_ENV
        ),
        RefreshOutcome::Failed(message) if snapshot.is_empty() => bail!(message),
        _ => {}
    }

    let output = if json {
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    } else {
        format_status(&snapshot, &chrono::Local::now())
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output)?;
    Ok(())
}

/// Plain-text status: glyph line, then one line per usage row
pub fn format_status<Tz>(snapshot: &UsageSnapshot, now: &chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let icon = classify(snapshot);
    let mut lines = vec![format!(
        "{} {}",
        StatusLine::glyph(&icon),
        icon.accessibility_description()
    )];

    if let PanelView::Rows { rows, extra, error } = panel_view(snapshot, now) {
        for row in rows {
            let mut line = format!("  {:16}{}", row.label, row.used_text);
            if let Some(reset) = row.reset_text {
                line.push_str(&format!("  {}", reset));
            }
            lines.push(line);
        }
        if let Some(extra) = extra {
            lines.push(format!(
                "  {:16}{}  {}",
                "Extra usage", extra.spent_text, extra.remaining_text
            ));
        }
        if let Some(error) = error {
            lines.push(format!("  error: {}", error));
        }
    }

    lines.join("\n")
}

/// Read the session key from stdin and store it with `org_id`
pub fn login(store: &dyn CredentialStore, org_id: &str, input: impl BufRead) -> Result<()> {
    let session_key = read_session_key(input)?;
    let credentials = Credentials::new(&session_key, org_id)?;
    store
        .save(&credentials)
        .context("Failed to store credentials")?;
    info!("Stored credentials for org {}", credentials.org_id());
    Ok(())
}

fn read_session_key(mut input: impl BufRead) -> Result<String> {
    if stdin_is_terminal() {
        eprint!("Session key: ");
        let _ = io::stderr().flush();
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read session key from stdin")?;
    Ok(line.trim().to_string())
}

fn stdin_is_terminal() -> bool {
    use std::io::IsTerminal;
    io::stdin().is_terminal()
}

/// Remove stored credentials
pub fn logout(store: &dyn CredentialStore) -> Result<()> {
    store.clear().context("Failed to remove credentials")?;
    info!("Removed stored credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_status() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let snapshot = UsageSnapshot {
            session_percent: Some(62.0),
            session_resets_at: Some(Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap()),
            opus_percent: Some(3.0),
            ..Default::default()
        };

        assert_eq!(
            format_status(&snapshot, &now),
            [
                "[██░] Claude Usage: 62%",
                "  Session (5 hr)  62% used  Resets in 2h 5m",
                "  Opus Weekly     3% used",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_format_status_loading() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert_eq!(
            format_status(&UsageSnapshot::default(), &now),
            "[░░░] Claude Usage"
        );
    }

    #[test]
    fn test_login_trims_and_stores() {
        let store = MemoryStore::new();
        login(&store, " org-1 ", "  sk-ant-1 \n".as_bytes()).unwrap();

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.org_id(), "org-1");
        assert_eq!(saved.session_key(), "sk-ant-1");
    }

    #[test]
    fn test_login_rejects_blank_key() {
        let store = MemoryStore::new();
        assert!(login(&store, "org-1", "\n".as_bytes()).is_err());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_logout_clears_store() {
        let store = MemoryStore::holding(Credentials::new("sk-ant-1", "org-1").unwrap());
        logout(&store).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_credential_store_prefers_environment() {
        temp_env::with_vars(
            vec![
                (SESSION_KEY_ENV, Some("sk-ant-env")),
                (ORG_ID_ENV, Some("org-env")),
            ],
            || {
                let store = credential_store();
                let loaded = store.load().unwrap().unwrap();
                assert_eq!(loaded.org_id(), "org-env");
            },
        );
    }

    #[tokio::test]
    async fn test_status_without_credentials_fails() {
        let service = build_service(&Settings::default(), Arc::new(MemoryStore::new()));
        let err = status(&service, false).await.unwrap_err();
        assert!(err.to_string().contains("No credentials stored"));
    }
}
