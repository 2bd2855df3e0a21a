//! Ebook download (lead) repository

use crate::db::DynDatabasePool;
use crate::models::{EbookDownload, LeadFilter, LeadWithEbook, NewEbookDownload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::search_pattern;

/// Lead repository trait
#[async_trait]
pub trait EbookDownloadRepository: Send + Sync {
    /// Store a lead, stamping `download_date` with the current time
    async fn create(&self, lead: &NewEbookDownload) -> Result<EbookDownload>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EbookDownload>>;

    /// Leads matching the filter, most recent first
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<LeadWithEbook>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based lead repository implementation
pub struct SqlxEbookDownloadRepository {
    pool: DynDatabasePool,
}

impl SqlxEbookDownloadRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EbookDownloadRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EbookDownloadRepository for SqlxEbookDownloadRepository {
    async fn create(&self, lead: &NewEbookDownload) -> Result<EbookDownload> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO ebook_downloads (ebook_id, first_name, last_name, email, phone,
                                         consent_mailing, download_date, ip_address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lead.ebook_id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.consent_mailing)
        .bind(now)
        .bind(&lead.ip_address)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create ebook download")?;

        Ok(EbookDownload {
            id: result.last_insert_rowid(),
            ebook_id: lead.ebook_id,
            first_name: lead.first_name.clone(),
            last_name: lead.last_name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            consent_mailing: lead.consent_mailing,
            download_date: now,
            ip_address: lead.ip_address.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EbookDownload>> {
        let row = sqlx::query(
            r#"
            SELECT id, ebook_id, first_name, last_name, email, phone, consent_mailing,
                   download_date, ip_address
            FROM ebook_downloads
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get ebook download by ID")?;

        Ok(row.as_ref().map(row_to_download))
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<LeadWithEbook>> {
        let ids = filter
            .ids
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode lead ids")?;

        let rows = sqlx::query(
            r#"
            SELECT d.id, d.ebook_id, d.first_name, d.last_name, d.email, d.phone,
                   d.consent_mailing, d.download_date, d.ip_address, e.title AS ebook_title
            FROM ebook_downloads d
            JOIN ebooks e ON e.id = d.ebook_id
            WHERE (?1 IS NULL OR d.email LIKE ?1 OR d.first_name LIKE ?1 OR d.last_name LIKE ?1)
              AND (?2 IS NULL OR d.ebook_id = ?2)
              AND (?3 IS NULL OR d.consent_mailing = ?3)
              AND (?4 IS NULL OR d.id IN (SELECT value FROM json_each(?4)))
            ORDER BY d.download_date DESC, d.id DESC
            "#,
        )
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.ebook_id)
        .bind(filter.consent_mailing)
        .bind(ids)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list ebook downloads")?;

        Ok(rows
            .iter()
            .map(|row| LeadWithEbook {
                lead: row_to_download(row),
                ebook_title: row.get("ebook_title"),
            })
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ebook_downloads WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete ebook download")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_download(row: &sqlx::sqlite::SqliteRow) -> EbookDownload {
    EbookDownload {
        id: row.get("id"),
        ebook_id: row.get("ebook_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        consent_mailing: row.get("consent_mailing"),
        download_date: row.get("download_date"),
        ip_address: row.get("ip_address"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxEbookDownloadRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let now = Utc::now();
        for (id, slug) in [(1, "guide"), (2, "checklist")] {
            sqlx::query(
                "INSERT INTO ebooks (id, title, slug, description, created_at, updated_at) VALUES (?, ?, ?, 'd', ?, ?)",
            )
            .bind(id)
            .bind(slug.to_uppercase())
            .bind(slug)
            .bind(now)
            .bind(now)
            .execute(pool.sqlite())
            .await
            .expect("Failed to create ebook");
        }

        SqlxEbookDownloadRepository::new(pool)
    }

    fn lead(ebook_id: i64, email: &str, consent: bool) -> NewEbookDownload {
        NewEbookDownload {
            ebook_id,
            first_name: "Claire".to_string(),
            last_name: "Bernard".to_string(),
            email: email.to_string(),
            phone: None,
            consent_mailing: consent,
            ip_address: Some("203.0.113.7".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_stamps_download_date() {
        let repo = setup_test_repo().await;
        let before = Utc::now();

        let created = repo.create(&lead(1, "claire@example.fr", true)).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert!(found.download_date >= before - chrono::Duration::seconds(1));
        assert_eq!(found.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(found.full_name(), "Claire Bernard");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = setup_test_repo().await;
        let a = repo.create(&lead(1, "a@example.fr", true)).await.unwrap();
        let b = repo.create(&lead(1, "b@example.fr", false)).await.unwrap();
        repo.create(&lead(2, "c@example.fr", true)).await.unwrap();

        assert_eq!(repo.list(&LeadFilter::default()).await.unwrap().len(), 3);

        let consented = repo
            .list(&LeadFilter {
                consent_mailing: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(consented.len(), 2);

        let by_ebook = repo
            .list(&LeadFilter {
                ebook_id: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_ebook.len(), 2);
        assert!(by_ebook.iter().all(|l| l.ebook_title == "GUIDE"));

        let by_ids = repo
            .list(&LeadFilter {
                ids: Some(vec![a.id, b.id]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_ids.len(), 2);

        let searched = repo
            .list(&LeadFilter {
                search: Some("c@exa".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&lead(1, "a@example.fr", true)).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
