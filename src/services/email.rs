//! Email notifications for ebook downloads
//!
//! Two messages are sent for each lead: a confirmation to the person who
//! downloaded the ebook and a notification to the site admin. Sending is
//! best effort; failures are logged and reported as `false`.

use crate::config::EmailConfig;
use crate::models::EbookDownload;
use crate::services::sitemap::escape_xml;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

/// A message ready to be handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Delivery seam between notification logic and SMTP
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(email.subject.clone());

        let message = match &email.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                html.clone(),
            )),
            None => builder.singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.text.clone()),
            ),
        }
        .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Used when email is disabled: messages are only logged
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email disabled, not sending");
        Ok(())
    }
}

/// Pick the transport for the configuration
pub fn create_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    if config.enabled {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

/// Builds and sends the lead notifications
pub struct EmailNotifier {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
    site_name: String,
}

impl EmailNotifier {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: Option<String>, site_name: impl Into<String>) -> Self {
        Self {
            mailer,
            admin_email: admin_email.filter(|e| !e.trim().is_empty()),
            site_name: site_name.into(),
        }
    }

    /// Thank the reader for downloading an ebook
    pub async fn send_ebook_confirmation(&self, recipient: &str, first_name: &str, ebook_title: &str) -> bool {
        let email = confirmation_email(&self.site_name, recipient, first_name, ebook_title);
        self.deliver(&email).await
    }

    /// Tell the admin about a new lead; `false` when no admin address is set
    pub async fn send_admin_download_notification(&self, lead: &EbookDownload, ebook_title: &str) -> bool {
        let Some(admin_email) = &self.admin_email else {
            return false;
        };
        let email = admin_notification_email(admin_email, lead, ebook_title);
        self.deliver(&email).await
    }

    async fn deliver(&self, email: &OutgoingEmail) -> bool {
        match self.mailer.send(email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(to = %email.to, error = %e, "Failed to send email");
                false
            }
        }
    }
}

fn confirmation_email(site_name: &str, recipient: &str, first_name: &str, ebook_title: &str) -> OutgoingEmail {
    let text = format!(
        "Bonjour {first_name},\n\n\
         Merci d'avoir téléchargé notre ebook \"{ebook_title}\".\n\
         Vous pouvez accéder à votre ebook via le lien fourni lors de votre demande.\n\n\
         Si vous avez des questions, n'hésitez pas à nous contacter.\n\n\
         Cordialement,\n\
         L'équipe {site_name}\n"
    );

    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<body style=\"font-family: Arial, sans-serif; color: #333;\">\n\
         <p>Bonjour {name},</p>\n\
         <p>Merci d'avoir téléchargé notre ebook <strong>&laquo;&nbsp;{title}&nbsp;&raquo;</strong>.</p>\n\
         <p>Vous pouvez accéder à votre ebook via le lien fourni lors de votre demande.</p>\n\
         <p>Si vous avez des questions, n'hésitez pas à nous contacter.</p>\n\
         <p>Cordialement,<br>L'équipe {site}</p>\n\
         </body>\n</html>\n",
        name = escape_xml(first_name),
        title = escape_xml(ebook_title),
        site = escape_xml(site_name),
    );

    OutgoingEmail {
        to: recipient.to_string(),
        subject: format!("Votre Ebook {}: {}", site_name, ebook_title),
        text,
        html: Some(html),
    }
}

fn admin_notification_email(admin_email: &str, lead: &EbookDownload, ebook_title: &str) -> OutgoingEmail {
    let text = format!(
        "Un nouvel utilisateur a téléchargé l'ebook '{title}':\n\n\
         Nom: {name}\n\
         Email: {email}\n\
         Téléphone: {phone}\n\
         Consent email: {consent}\n\
         Date: {date}\n\
         IP: {ip}\n",
        title = ebook_title,
        name = lead.full_name(),
        email = lead.email,
        phone = lead.phone.as_deref().filter(|p| !p.is_empty()).unwrap_or("Non fourni"),
        consent = if lead.consent_mailing { "Oui" } else { "Non" },
        date = lead.download_date.format("%d/%m/%Y %H:%M UTC"),
        ip = lead.ip_address.as_deref().unwrap_or("Inconnue"),
    );

    OutgoingEmail {
        to: admin_email.to_string(),
        subject: format!("Nouveau téléchargement de l'ebook: {}", ebook_title),
        text,
        html: None,
    }
}
