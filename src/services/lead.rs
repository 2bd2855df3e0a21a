//! Ebook lead capture and export
//!
//! A lead is recorded when a visitor fills the download form of an ebook.
//! Field errors use the `{"field": ["message"]}` shape the site front-end
//! already understands.

use crate::db::repositories::{EbookDownloadRepository, EbookRepository};
use crate::models::{Ebook, EbookDownload, LeadFilter, LeadWithEbook, NewEbookDownload};
use crate::services::email::EmailNotifier;
use anyhow::Context;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SUCCESS_MESSAGE: &str =
    "Téléchargement enregistré avec succès. Un email de confirmation vous a été envoyé.";

const MSG_REQUIRED: &str = "This field is required.";
const MSG_NULL: &str = "This field may not be null.";
const MSG_BLANK: &str = "This field may not be blank.";
const MSG_EMAIL: &str = "Enter a valid email address.";
const MSG_BOOLEAN: &str = "Must be a valid boolean.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid email regex")
});

/// Field name to messages, serialized as the 400 body
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("Invalid lead submission")]
    Invalid(FieldErrors),

    #[error("Lead {0} not found")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Raw download form; values stay untyped so that every field can be
/// reported on at once. A missing key is `None`, an explicit `null` is
/// `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    #[serde(default, deserialize_with = "present")]
    pub ebook: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub consent_mailing: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Validated form, before the ebook lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ValidLead {
    pub ebook_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent_mailing: bool,
}

/// Absent keys count as missing; explicit `null` is reported separately
fn field<'a>(value: &'a Option<Value>, errors: &mut FieldErrors, name: &str) -> Option<&'a Value> {
    match value {
        None => {
            errors.entry(name.to_string()).or_default().push(MSG_REQUIRED.to_string());
            None
        }
        Some(Value::Null) => {
            errors.entry(name.to_string()).or_default().push(MSG_NULL.to_string());
            None
        }
        Some(v) => Some(v),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(
    value: &Option<Value>,
    errors: &mut FieldErrors,
    name: &str,
    max: usize,
) -> Option<String> {
    let raw = field(value, errors, name)?;
    let push = |errors: &mut FieldErrors, msg: String| {
        errors.entry(name.to_string()).or_default().push(msg);
    };

    match text(raw) {
        None => {
            push(errors, "Not a valid string.".to_string());
            None
        }
        Some(s) if s.is_empty() => {
            push(errors, MSG_BLANK.to_string());
            None
        }
        Some(s) if s.chars().count() > max => {
            push(errors, format!("Ensure this field has no more than {} characters.", max));
            None
        }
        Some(s) => Some(s),
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" | "y" | "t" => Some(true),
            "false" | "0" | "off" | "no" | "n" | "f" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl LeadSubmission {
    /// Check every field, collecting all errors
    pub fn validate(&self) -> Result<ValidLead, FieldErrors> {
        let mut errors = FieldErrors::new();

        let ebook_id = field(&self.ebook, &mut errors, "ebook").and_then(|v| {
            let id = match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            if id.is_none() {
                let kind = match v {
                    Value::String(_) => "str",
                    Value::Bool(_) => "bool",
                    Value::Array(_) => "list",
                    Value::Object(_) => "dict",
                    _ => "float",
                };
                errors.entry("ebook".to_string()).or_default().push(format!(
                    "Incorrect type. Expected pk value, received {}.",
                    kind
                ));
            }
            id
        });

        let first_name = required_text(&self.first_name, &mut errors, "first_name", 100);
        let last_name = required_text(&self.last_name, &mut errors, "last_name", 100);

        let email = required_text(&self.email, &mut errors, "email", 254).and_then(|email| {
            if EMAIL_RE.is_match(&email) {
                Some(email)
            } else {
                errors.entry("email".to_string()).or_default().push(MSG_EMAIL.to_string());
                None
            }
        });

        let phone = match &self.phone {
            None | Some(Value::Null) => None,
            Some(v) => match text(v) {
                Some(p) if p.chars().count() > 20 => {
                    errors.entry("phone".to_string()).or_default().push(
                        "Ensure this field has no more than 20 characters.".to_string(),
                    );
                    None
                }
                Some(p) if p.is_empty() => None,
                Some(p) => Some(p),
                None => {
                    errors.entry("phone".to_string()).or_default().push("Not a valid string.".to_string());
                    None
                }
            },
        };

        let consent_mailing = match &self.consent_mailing {
            None => false,
            Some(Value::Null) => {
                errors.entry("consent_mailing".to_string()).or_default().push(MSG_NULL.to_string());
                false
            }
            Some(v) => boolean(v).unwrap_or_else(|| {
                errors.entry("consent_mailing".to_string()).or_default().push(MSG_BOOLEAN.to_string());
                false
            }),
        };

        match (ebook_id, first_name, last_name, email) {
            (Some(ebook_id), Some(first_name), Some(last_name), Some(email)) if errors.is_empty() => {
                Ok(ValidLead {
                    ebook_id,
                    first_name,
                    last_name,
                    email,
                    phone,
                    consent_mailing,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Absolute URL the visitor downloads the ebook from
///
/// `file_url` is the public media URL of the ebook file. Non-http results
/// are forced to https.
pub fn build_download_url(host: &str, scheme: &str, file_url: &str) -> String {
    let scheme = match scheme {
        "https" => "https",
        _ => "http",
    };

    let url = if file_url.starts_with("http://") || file_url.starts_with("https://") || host.is_empty() {
        file_url.to_string()
    } else {
        format!("{}://{}{}", scheme, host, file_url)
    };

    if url.starts_with("http") {
        url
    } else if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        format!("https://{}{}", host, file_url)
    }
}

/// CSV export of leads
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// Render leads as CSV: `Email,Prénom,Nom,Consentement,Date`
pub fn leads_to_csv(leads: &[LeadWithEbook]) -> String {
    let mut out = String::from("Email,Prénom,Nom,Consentement,Date\r\n");
    for LeadWithEbook { lead, .. } in leads {
        let row = [
            csv_field(&lead.email),
            csv_field(&lead.first_name),
            csv_field(&lead.last_name),
            (if lead.consent_mailing { "Oui" } else { "Non" }).to_string(),
            lead.download_date.format("%Y-%m-%d %H:%M").to_string(),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn export_filename(consented_only: bool, at: DateTime<Utc>) -> String {
    format!(
        "email_list_{}_{}.csv",
        if consented_only { "consented" } else { "all" },
        at.format("%Y%m%d-%H%M%S")
    )
}

/// Records leads and fires the notification emails
pub struct LeadService {
    ebook_repo: Arc<dyn EbookRepository>,
    lead_repo: Arc<dyn EbookDownloadRepository>,
    notifier: Arc<EmailNotifier>,
}

impl LeadService {
    pub fn new(
        ebook_repo: Arc<dyn EbookRepository>,
        lead_repo: Arc<dyn EbookDownloadRepository>,
        notifier: Arc<EmailNotifier>,
    ) -> Self {
        Self {
            ebook_repo,
            lead_repo,
            notifier,
        }
    }

    /// Validate and store a download request
    ///
    /// Emails are sent from a spawned task; their outcome never affects the
    /// response.
    pub async fn submit(
        &self,
        submission: &LeadSubmission,
        ip_address: Option<String>,
    ) -> Result<(EbookDownload, Ebook), LeadError> {
        let valid = submission.validate().map_err(LeadError::Invalid)?;

        let ebook = self
            .ebook_repo
            .get_by_id(valid.ebook_id)
            .await
            .context("Failed to get ebook")?
            .ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "ebook".to_string(),
                    vec![format!("Invalid pk \"{}\" - object does not exist.", valid.ebook_id)],
                );
                LeadError::Invalid(errors)
            })?;

        let lead = self
            .lead_repo
            .create(&NewEbookDownload {
                ebook_id: ebook.id,
                first_name: valid.first_name,
                last_name: valid.last_name,
                email: valid.email,
                phone: valid.phone,
                consent_mailing: valid.consent_mailing,
                ip_address,
            })
            .await
            .context("Failed to store ebook download")?;

        tracing::info!(lead_id = lead.id, ebook_id = ebook.id, "Ebook download recorded");

        let notifier = self.notifier.clone();
        let spawned_lead = lead.clone();
        let title = ebook.title.clone();
        tokio::spawn(async move {
            notifier.send_admin_download_notification(&spawned_lead, &title).await;
            notifier
                .send_ebook_confirmation(&spawned_lead.email, &spawned_lead.first_name, &title)
                .await;
        });

        Ok((lead, ebook))
    }

    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<LeadWithEbook>, LeadError> {
        Ok(self.lead_repo.list(filter).await.context("Failed to list leads")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), LeadError> {
        if !self.lead_repo.delete(id).await.context("Failed to delete lead")? {
            return Err(LeadError::NotFound(id));
        }
        Ok(())
    }

    /// Export the selected leads, optionally only those who consented
    pub async fn export_csv(&self, filter: &LeadFilter, consented_only: bool) -> Result<CsvExport, LeadError> {
        let mut filter = filter.clone();
        if consented_only {
            filter.consent_mailing = Some(true);
        }
        let leads = self.list(&filter).await?;

        tracing::info!(count = leads.len(), consented_only, "Exported leads");
        Ok(CsvExport {
            filename: export_filename(consented_only, Utc::now()),
            content: leads_to_csv(&leads),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxEbookDownloadRepository, SqlxEbookRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::EbookInput;
    use crate::services::email::testing::RecordingMailer;
    use chrono::TimeZone;
    use serde_json::json;

    fn submission(body: Value) -> LeadSubmission {
        serde_json::from_value(body).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "ebook": 1,
            "first_name": "Léa",
            "last_name": "Moreau",
            "email": "lea@example.fr",
            "phone": "0601020304",
            "consent_mailing": true
        })
    }

    #[test]
    fn test_validate_ok() {
        let lead = submission(valid_body()).validate().unwrap();
        assert_eq!(lead.ebook_id, 1);
        assert_eq!(lead.phone.as_deref(), Some("0601020304"));
        assert!(lead.consent_mailing);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let errors = submission(json!({
            "ebook": "abc",
            "first_name": "",
            "email": "not-an-email",
            "phone": "0".repeat(21),
            "consent_mailing": "maybe"
        }))
        .validate()
        .unwrap_err();

        assert_eq!(errors["ebook"], vec!["Incorrect type. Expected pk value, received str."]);
        assert_eq!(errors["first_name"], vec![MSG_BLANK]);
        assert_eq!(errors["last_name"], vec![MSG_REQUIRED]);
        assert_eq!(errors["email"], vec![MSG_EMAIL]);
        assert_eq!(errors["phone"], vec!["Ensure this field has no more than 20 characters."]);
        assert_eq!(errors["consent_mailing"], vec![MSG_BOOLEAN]);
    }

    #[test]
    fn test_validate_defaults() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("consent_mailing");
        body["phone"] = json!("");
        body["ebook"] = json!("1");

        let lead = submission(body).validate().unwrap();
        assert!(!lead.consent_mailing);
        assert!(lead.phone.is_none());
        assert_eq!(lead.ebook_id, 1);
    }

    #[test]
    fn test_null_is_not_missing() {
        let mut body = valid_body();
        body["email"] = Value::Null;
        body["phone"] = Value::Null;
        body["consent_mailing"] = Value::Null;
        body.as_object_mut().unwrap().remove("last_name");

        let errors = submission(body).validate().unwrap_err();
        assert_eq!(errors["email"], vec![MSG_NULL]);
        assert_eq!(errors["consent_mailing"], vec![MSG_NULL]);
        assert_eq!(errors["last_name"], vec![MSG_REQUIRED]);
        assert!(!errors.contains_key("phone"));
    }

    #[test]
    fn test_name_length_limit() {
        let mut body = valid_body();
        body["first_name"] = json!("é".repeat(101));

        let errors = submission(body).validate().unwrap_err();
        assert_eq!(errors["first_name"], vec!["Ensure this field has no more than 100 characters."]);
    }

    #[test]
    fn test_build_download_url() {
        assert_eq!(
            build_download_url("api.immoshift.fr", "https", "/media/ebooks/files/g.pdf"),
            "https://api.immoshift.fr/media/ebooks/files/g.pdf"
        );
        assert_eq!(
            build_download_url("localhost:8000", "gopher", "/media/g.pdf"),
            "http://localhost:8000/media/g.pdf"
        );
        assert_eq!(
            build_download_url("", "http", "//cdn.immoshift.fr/g.pdf"),
            "https://cdn.immoshift.fr/g.pdf"
        );
        assert_eq!(
            build_download_url("", "http", "https://cdn.immoshift.fr/g.pdf"),
            "https://cdn.immoshift.fr/g.pdf"
        );
    }

    fn lead_row(email: &str, first_name: &str, consent: bool) -> LeadWithEbook {
        LeadWithEbook {
            lead: EbookDownload {
                id: 1,
                ebook_id: 1,
                first_name: first_name.to_string(),
                last_name: "Moreau".to_string(),
                email: email.to_string(),
                phone: None,
                consent_mailing: consent,
                download_date: Utc.with_ymd_and_hms(2024, 1, 2, 9, 5, 0).unwrap(),
                ip_address: None,
            },
            ebook_title: "Guide".to_string(),
        }
    }

    #[test]
    fn test_leads_to_csv() {
        let csv = leads_to_csv(&[
            lead_row("a@x.fr", "Léa", true),
            lead_row("b@x.fr", "Jean, \"JJ\"", false),
        ]);

        assert_eq!(
            csv,
            "Email,Prénom,Nom,Consentement,Date\r\n\
             a@x.fr,Léa,Moreau,Oui,2024-01-02 09:05\r\n\
             b@x.fr,\"Jean, \"\"JJ\"\"\",Moreau,Non,2024-01-02 09:05\r\n"
        );
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 9).unwrap();
        assert_eq!(export_filename(false, at), "email_list_all_20240601-080009.csv");
        assert_eq!(export_filename(true, at), "email_list_consented_20240601-080009.csv");
    }

    async fn setup_test_service() -> (LeadService, Arc<RecordingMailer>, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let ebook_repo = SqlxEbookRepository::boxed(pool.clone());
        let ebook = ebook_repo
            .create(
                "guide",
                &EbookInput {
                    title: "Guide".to_string(),
                    slug: None,
                    description: "d".to_string(),
                    cover_image: "ebooks/covers/c.jpg".to_string(),
                    file: "ebooks/files/g.pdf".to_string(),
                    is_active: true,
                    position: 0,
                },
            )
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Arc::new(EmailNotifier::new(
            mailer.clone(),
            Some("admin@immoshift.fr".to_string()),
            "Immoshift",
        ));
        let service = LeadService::new(ebook_repo, SqlxEbookDownloadRepository::boxed(pool), notifier);
        (service, mailer, ebook.id)
    }

    #[tokio::test]
    async fn test_submit_stores_ip_and_sends_emails() {
        let (service, mailer, ebook_id) = setup_test_service().await;
        let mut body = valid_body();
        body["ebook"] = json!(ebook_id);

        let (lead, ebook) = service
            .submit(&submission(body), Some("198.51.100.4".to_string()))
            .await
            .unwrap();
        assert_eq!(lead.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(ebook.title, "Guide");

        for _ in 0..50 {
            if mailer.sent().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let recipients: Vec<String> = mailer.sent().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["admin@immoshift.fr", "lea@example.fr"]);
    }

    #[tokio::test]
    async fn test_submit_unknown_ebook() {
        let (service, _, _) = setup_test_service().await;
        let mut body = valid_body();
        body["ebook"] = json!(999);

        match service.submit(&submission(body), None).await {
            Err(LeadError::Invalid(errors)) => {
                assert_eq!(errors["ebook"], vec!["Invalid pk \"999\" - object does not exist."]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_consented_only() {
        let (service, _, ebook_id) = setup_test_service().await;
        for (email, consent) in [("a@x.fr", true), ("b@x.fr", false)] {
            let mut body = valid_body();
            body["ebook"] = json!(ebook_id);
            body["email"] = json!(email);
            body["consent_mailing"] = json!(consent);
            service.submit(&submission(body), None).await.unwrap();
        }

        let all = service.export_csv(&LeadFilter::default(), false).await.unwrap();
        assert_eq!(all.content.lines().count(), 3);
        assert!(all.filename.starts_with("email_list_all_"));

        let consented = service.export_csv(&LeadFilter::default(), true).await.unwrap();
        assert_eq!(consented.content.lines().count(), 2);
        assert!(consented.content.contains("a@x.fr"));
        assert!(consented.filename.starts_with("email_list_consented_"));
    }
}
