// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact identity resolution.
//!
//! Engines identify peers by a phone-derived identifier, a LID, or both,
//! and the two can arrive on separate events. Resolution looks up by each
//! key independently; when the lookups hit different rows the identities
//! have collided and are merged, identifier match winning. Concurrent
//! resolutions may race to create duplicates; the merge path corrects them
//! on the next event that carries both keys.

use chrono::Utc;
use tracing::{debug, info, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::WireContact;
use deskwire_core::types::EntityAction;
use deskwire_storage::models::Contact;
use deskwire_storage::queries::contacts;

use crate::pipeline::Pipeline;

/// Whether a display name is just a raw identifier: a JID (contains `@`)
/// or a bare phone number.
pub fn looks_like_jid(name: &str) -> bool {
    !name.is_empty() && (name.contains('@') || name.chars().all(|c| c.is_ascii_digit()))
}

/// Whether `incoming` should replace `current` as the display name.
///
/// A raw identifier never overwrites a real name; anything else non-empty
/// and different wins.
fn name_improves(current: &str, incoming: &str) -> bool {
    if incoming.is_empty() || incoming == current {
        return false;
    }
    if looks_like_jid(incoming) && !current.is_empty() && !looks_like_jid(current) {
        return false;
    }
    true
}

fn fallback_name(wire: &WireContact) -> String {
    wire.name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| wire.identifier.clone())
        .or_else(|| wire.lid.clone())
        .unwrap_or_default()
}

impl Pipeline {
    /// Find or create the contact a wire profile refers to, merging
    /// collided rows and folding in updated fields.
    pub async fn resolve_contact(
        &self,
        tenant_id: i64,
        wire: &WireContact,
    ) -> Result<Contact, DeskwireError> {
        let by_lid = match wire.lid.as_deref().filter(|l| !l.is_empty()) {
            Some(lid) => contacts::find_by_lid(&self.db, tenant_id, lid).await?,
            None => None,
        };
        let by_identifier = match wire.identifier.as_deref().filter(|i| !i.is_empty()) {
            Some(identifier) => {
                contacts::find_by_identifier(&self.db, tenant_id, identifier).await?
            }
            None => None,
        };

        match (by_identifier, by_lid) {
            (Some(target), Some(loser)) if target.id != loser.id => {
                self.merge_collision(target, loser, wire).await
            }
            (Some(existing), _) | (None, Some(existing)) => {
                let mut contact = existing;
                if self.apply_wire_fields(&mut contact, wire).await {
                    contacts::update_contact(&self.db, &contact).await?;
                    self.emit_contact(&contact, EntityAction::Update).await;
                }
                Ok(contact)
            }
            (None, None) => self.create_contact(tenant_id, wire).await,
        }
    }

    /// Two rows turned out to be one identity. The identifier match is the
    /// merge target; the LID row loses its tickets and messages to it.
    async fn merge_collision(
        &self,
        mut target: Contact,
        loser: Contact,
        wire: &WireContact,
    ) -> Result<Contact, DeskwireError> {
        info!(
            tenant_id = target.tenant_id,
            target_id = target.id,
            loser_id = loser.id,
            "contact identity collision, merging"
        );

        if target.lid.is_none() {
            target.lid = loser.lid.clone();
        }
        if name_improves(&target.name, &loser.name) {
            target.name = loser.name.clone();
        }
        if target.avatar_url.is_none() {
            target.avatar_url = loser.avatar_url.clone();
        }
        self.apply_wire_fields(&mut target, wire).await;

        contacts::update_contact(&self.db, &target).await?;
        contacts::merge_contacts(&self.db, target.id, loser.id).await?;

        self.emit_contact_deleted(loser.tenant_id, loser.id).await;
        self.emit_contact(&target, EntityAction::Update).await;
        Ok(target)
    }

    async fn create_contact(
        &self,
        tenant_id: i64,
        wire: &WireContact,
    ) -> Result<Contact, DeskwireError> {
        let avatar_url = match wire.avatar_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Some(self.cache_avatar(tenant_id, url).await),
            None => None,
        };
        let extra_info = if wire.extra_info.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&wire.extra_info)
                .map_err(|e| DeskwireError::Internal(format!("extra info encode: {e}")))?
        };
        let contact = contacts::insert_contact(
            &self.db,
            contacts::NewContact {
                tenant_id,
                identifier: wire.identifier.clone().filter(|i| !i.is_empty()),
                lid: wire.lid.clone().filter(|l| !l.is_empty()),
                name: fallback_name(wire),
                avatar_url,
                is_group: wire.is_group,
                extra_info,
            },
        )
        .await?;
        debug!(tenant_id, contact_id = contact.id, "contact created");
        self.emit_contact(&contact, EntityAction::Create).await;
        Ok(contact)
    }

    /// Fold wire fields into an existing row. Returns whether anything
    /// changed.
    async fn apply_wire_fields(&self, contact: &mut Contact, wire: &WireContact) -> bool {
        let mut changed = false;

        if contact.identifier.is_none() {
            if let Some(identifier) = wire.identifier.as_deref().filter(|i| !i.is_empty()) {
                contact.identifier = Some(identifier.to_string());
                changed = true;
            }
        }
        if contact.lid.is_none() {
            if let Some(lid) = wire.lid.as_deref().filter(|l| !l.is_empty()) {
                contact.lid = Some(lid.to_string());
                changed = true;
            }
        }
        if let Some(name) = wire.name.as_deref() {
            if name_improves(&contact.name, name) {
                contact.name = name.to_string();
                changed = true;
            }
        }
        if let Some(url) = wire.avatar_url.as_deref().filter(|u| !u.is_empty()) {
            let cached = self.cache_avatar(contact.tenant_id, url).await;
            if contact.avatar_url.as_deref() != Some(cached.as_str()) {
                contact.avatar_url = Some(cached);
                changed = true;
            }
        }
        if !wire.extra_info.is_empty() {
            if let Ok(encoded) = serde_json::to_string(&wire.extra_info) {
                if contact.extra_info != encoded {
                    contact.extra_info = encoded;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Download an avatar into the media directory under a timestamped
    /// (cache-busting) filename. Falls back to the remote URL on any
    /// failure so enrichment still sees a non-empty avatar.
    pub(crate) async fn cache_avatar(&self, tenant_id: i64, remote_url: &str) -> String {
        match self.download_avatar(tenant_id, remote_url).await {
            Ok(local) => local,
            Err(e) => {
                warn!(tenant_id, remote_url, error = %e, "avatar download failed, keeping remote url");
                remote_url.to_string()
            }
        }
    }

    async fn download_avatar(
        &self,
        tenant_id: i64,
        remote_url: &str,
    ) -> Result<String, DeskwireError> {
        let response = self
            .http
            .get(remote_url)
            .send()
            .await
            .map_err(|e| DeskwireError::Internal(format!("avatar fetch: {e}")))?;
        if !response.status().is_success() {
            return Err(DeskwireError::Internal(format!(
                "avatar fetch returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DeskwireError::Internal(format!("avatar body: {e}")))?;

        let dir = self.settings.media_dir.join("avatars");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DeskwireError::Internal(format!("media dir: {e}")))?;
        let path = dir.join(format!(
            "{tenant_id}-{}.jpg",
            Utc::now().timestamp_millis()
        ));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| DeskwireError::Internal(format!("avatar write: {e}")))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TENANT, testbed};
    use deskwire_core::types::TicketStatus;
    use deskwire_storage::queries::tickets::{NewTicket, create_ticket, get_ticket};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn wire(identifier: Option<&str>, lid: Option<&str>, name: Option<&str>) -> WireContact {
        WireContact {
            identifier: identifier.map(String::from),
            lid: lid.map(String::from),
            name: name.map(String::from),
            avatar_url: None,
            is_group: false,
            extra_info: vec![],
        }
    }

    #[test]
    fn jid_detection() {
        assert!(looks_like_jid("5511999@c.us"));
        assert!(looks_like_jid("5511999999999"));
        assert!(!looks_like_jid("Ana"));
        assert!(!looks_like_jid(""));
    }

    #[tokio::test]
    async fn unseen_contact_is_created() {
        let bed = testbed().await;
        let contact = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        assert_eq!(contact.name, "Ana");
        assert_eq!(contact.identifier.as_deref(), Some("5511999@c.us"));
        assert_eq!(bed.notifier.events_of("contact").len(), 1);
    }

    #[tokio::test]
    async fn resolution_is_stable_across_events() {
        let bed = testbed().await;
        let first = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        let second = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn collision_merges_into_identifier_match() {
        let bed = testbed().await;
        // Same person seen twice: once by phone identifier, once by LID.
        let by_phone = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        let by_lid = bed
            .pipeline
            .resolve_contact(TENANT, &wire(None, Some("lid-1"), None))
            .await
            .unwrap();
        assert_ne!(by_phone.id, by_lid.id);

        let ticket = create_ticket(
            bed.pipeline.db(),
            NewTicket {
                tenant_id: TENANT,
                contact_id: by_lid.id,
                connection_id: 3,
                status: TicketStatus::Pending,
                is_group: false,
                unread_count: 0,
                last_message: String::new(),
            },
        )
        .await
        .unwrap();

        // An update carrying both keys reveals the collision.
        let merged = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), Some("lid-1"), None))
            .await
            .unwrap();
        assert_eq!(merged.id, by_phone.id);
        assert_eq!(merged.lid.as_deref(), Some("lid-1"));
        assert_eq!(merged.name, "Ana");

        // The loser is gone and its ticket reassigned.
        assert!(
            contacts::get_contact(bed.pipeline.db(), by_lid.id)
                .await
                .unwrap()
                .is_none()
        );
        let reassigned = get_ticket(bed.pipeline.db(), ticket.id).await.unwrap().unwrap();
        assert_eq!(reassigned.contact_id, merged.id);
    }

    #[tokio::test]
    async fn jid_name_never_overwrites_real_name() {
        let bed = testbed().await;
        bed.pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        let contact = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("5511999@c.us")))
            .await
            .unwrap();
        assert_eq!(contact.name, "Ana");
    }

    #[tokio::test]
    async fn real_name_replaces_jid_placeholder() {
        let bed = testbed().await;
        bed.pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, None))
            .await
            .unwrap();
        let contact = bed
            .pipeline
            .resolve_contact(TENANT, &wire(Some("5511999@c.us"), None, Some("Ana")))
            .await
            .unwrap();
        assert_eq!(contact.name, "Ana");
    }

    #[tokio::test]
    async fn avatar_is_downloaded_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;

        let bed = testbed().await;
        let mut w = wire(Some("5511999@c.us"), None, Some("Ana"));
        w.avatar_url = Some(format!("{}/pic.jpg", server.uri()));
        let contact = bed.pipeline.resolve_contact(TENANT, &w).await.unwrap();

        let avatar = contact.avatar_url.unwrap();
        assert!(avatar.contains("avatars"));
        assert_eq!(tokio::fs::read(&avatar).await.unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn failed_avatar_download_keeps_remote_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let bed = testbed().await;
        let remote = format!("{}/pic.jpg", server.uri());
        let mut w = wire(Some("5511999@c.us"), None, Some("Ana"));
        w.avatar_url = Some(remote.clone());
        let contact = bed.pipeline.resolve_contact(TENANT, &w).await.unwrap();
        assert_eq!(contact.avatar_url.as_deref(), Some(remote.as_str()));
    }
}
