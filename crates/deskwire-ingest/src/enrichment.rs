// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The enrichment barrier.
//!
//! Contact enrichment (roster sync filling in name and avatar) happens
//! asynchronously in the engine. A synchronous caller that wants to show
//! a finished contact can wait here: a bounded poll that returns early
//! once the contact looks real and degrades to proceed-without on
//! timeout. Timing out is not an error.

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use deskwire_core::DeskwireError;
use deskwire_storage::models::Contact;
use deskwire_storage::queries::contacts;

use crate::contact::looks_like_jid;
use crate::pipeline::Pipeline;

/// A contact is enriched once it has an avatar and a display name that is
/// not just its own identifier.
pub fn is_enriched(contact: &Contact) -> bool {
    let has_avatar = contact
        .avatar_url
        .as_deref()
        .is_some_and(|url| !url.is_empty());
    has_avatar && !contact.name.is_empty() && !looks_like_jid(&contact.name)
}

impl Pipeline {
    /// Poll until the contact is enriched or the ceiling is hit, returning
    /// the freshest row either way.
    pub async fn await_enrichment(&self, contact_id: i64) -> Result<Contact, DeskwireError> {
        let deadline = Instant::now() + self.settings.enrichment_timeout;
        loop {
            let contact = contacts::get_contact(&self.db, contact_id)
                .await?
                .ok_or(DeskwireError::NotFound {
                    entity: "contact",
                    id: contact_id.to_string(),
                })?;
            if is_enriched(&contact) {
                debug!(contact_id, "contact enriched");
                return Ok(contact);
            }
            if Instant::now() >= deadline {
                warn!(
                    contact_id,
                    timeout = ?self.settings.enrichment_timeout,
                    "enrichment timed out, proceeding with partial contact"
                );
                return Ok(contact);
            }
            sleep(self.settings.enrichment_poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TENANT, testbed};
    use deskwire_storage::queries::contacts::{NewContact, insert_contact, update_contact};

    async fn bare_contact(db: &deskwire_storage::Database) -> Contact {
        insert_contact(
            db,
            NewContact {
                tenant_id: TENANT,
                identifier: Some("5511999@c.us".to_string()),
                name: "5511999@c.us".to_string(),
                ..NewContact::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn enriched_contact_returns_immediately() {
        let bed = testbed().await;
        let mut contact = bare_contact(bed.pipeline.db()).await;
        contact.name = "Ana".to_string();
        contact.avatar_url = Some("/media/a.jpg".to_string());
        update_contact(bed.pipeline.db(), &contact).await.unwrap();

        let start = Instant::now();
        let resolved = bed.pipeline.await_enrichment(contact.id).await.unwrap();
        assert!(is_enriched(&resolved));
        assert!(start.elapsed() < bed.pipeline.settings.enrichment_timeout);
    }

    #[tokio::test]
    async fn barrier_picks_up_concurrent_enrichment() {
        let bed = testbed().await;
        let contact = bare_contact(bed.pipeline.db()).await;

        let db = bed.pipeline.db().clone();
        let mut updated = contact.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(40)).await;
            updated.name = "Ana".to_string();
            updated.avatar_url = Some("/media/a.jpg".to_string());
            update_contact(&db, &updated).await.unwrap();
        });

        let resolved = bed.pipeline.await_enrichment(contact.id).await.unwrap();
        assert_eq!(resolved.name, "Ana");
    }

    #[tokio::test]
    async fn timeout_proceeds_with_partial_contact() {
        let bed = testbed().await;
        let contact = bare_contact(bed.pipeline.db()).await;

        // Nothing enriches it; the barrier must still return Ok.
        let resolved = bed.pipeline.await_enrichment(contact.id).await.unwrap();
        assert!(!is_enriched(&resolved));
    }
}
