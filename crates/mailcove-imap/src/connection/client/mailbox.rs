//! Mailbox management operations.

use std::collections::HashMap;

use super::{ExecResult, ImapClient};
use crate::command::{Command, QresyncParams, StatusAttribute};
use crate::connection::state::ProtocolState;
use crate::parser::{ListSource, StatusItem, UntaggedResponse};
use crate::paths::{decode_path, sort_folders, special_use_for_name, split_path};
use crate::types::{
    Capability, Folder, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ModSeq,
    Namespaces, ResponseCode, SelectedMailbox, Status, UidValidity,
};
use crate::{Error, Result};

/// Options for folder listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Reference name; defaults to the empty root.
    pub reference: String,
    /// Mailbox pattern; defaults to `*`.
    pub pattern: Option<String>,
    /// Skip the LSUB merge.
    pub list_only: bool,
    /// Request STATUS values for each listed folder.
    pub status_items: Option<Vec<StatusAttribute>>,
    /// Caller-supplied special-use overrides by path.
    pub special_use_hints: HashMap<String, MailboxAttribute>,
}

/// Options for SELECT/EXAMINE.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Open read-only (EXAMINE).
    pub read_only: bool,
    /// Prior HIGHESTMODSEQ for QRESYNC replay.
    pub changed_since: Option<ModSeq>,
    /// Prior UIDVALIDITY for QRESYNC replay.
    pub uid_validity: Option<UidValidity>,
}

/// CREATE result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxCreated {
    /// Unicode path.
    pub path: String,
    /// False when the mailbox already existed (ALREADYEXISTS).
    pub created: bool,
}

/// RENAME result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameResult {
    /// Old unicode path.
    pub path: String,
    /// New unicode path.
    pub new_path: String,
}

impl ImapClient {
    /// Enables extensions via ENABLE (RFC 5161).
    ///
    /// Filters the requested extensions to those the server advertises and
    /// records the server's ENABLED reply. Returns the newly enabled set.
    pub async fn enable(&mut self, extensions: &[&str]) -> Result<Vec<String>> {
        if !self.state.is_authenticated() || !self.has_capability(&Capability::Enable) {
            return Ok(Vec::new());
        }

        let requested: Vec<String> = extensions
            .iter()
            .map(|e| e.trim().to_uppercase())
            .filter(|e| {
                let cap = Capability::parse(e);
                self.has_capability(&cap)
            })
            .collect();

        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let result = self
            .exec(&Command::Enable {
                capabilities: requested,
            })
            .await?
            .into_result()?;

        let mut enabled = Vec::new();
        for response in result.untagged {
            if let UntaggedResponse::Enabled(extensions) = response {
                enabled.extend(extensions);
            }
        }

        for extension in &enabled {
            if !self.enabled.contains(extension) {
                self.enabled.push(extension.clone());
            }
        }

        Ok(enabled)
    }

    /// Opens a mailbox with SELECT (or EXAMINE for read-only access).
    ///
    /// When QRESYNC is enabled and the caller supplies prior state, the
    /// server replays VANISHED and flag changes through the cache. Emits
    /// `mailbox_open` on success; a failed selection while already in the
    /// selected state falls back to authenticated and emits
    /// `mailbox_close`.
    pub async fn mailbox_open(
        &mut self,
        path: &str,
        options: &SelectOptions,
    ) -> Result<&SelectedMailbox> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "SELECT requires authentication".to_string(),
            ));
        }

        // The folder listing supplies delimiter and special-use metadata
        if self.folders.is_empty() {
            let _ = self.list(&ListOptions::default()).await;
        }

        let wire_path = self.normalize(path);
        let folder = self
            .folders
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(path) || f.path_as_listed == wire_path);
        let delimiter = folder.and_then(|f| f.delimiter).or_else(|| self.delimiter_hint());
        let special_use = folder.and_then(|f| f.special_use.clone());
        let display_path = folder.map_or_else(|| path.to_string(), |f| f.path.clone());

        let qresync = if self.qresync_enabled()
            && let (Some(modseq), Some(validity)) = (options.changed_since, options.uid_validity)
        {
            Some(QresyncParams::new(validity, modseq))
        } else {
            None
        };

        let previous = self.cache.mailbox().cloned();
        let mut mailbox = SelectedMailbox::new(display_path);
        mailbox.delimiter = delimiter;
        mailbox.special_use = special_use;
        mailbox.read_only = options.read_only;
        self.cache.open(mailbox);

        let command = if options.read_only {
            Command::Examine {
                mailbox: Mailbox::new(wire_path),
                qresync,
            }
        } else {
            Command::Select {
                mailbox: Mailbox::new(wire_path),
                condstore: self.condstore_enabled(),
                qresync,
            }
        };

        let was_selected = self.state.is_selected();
        match self.exec(&command).await.and_then(ExecResult::into_result) {
            Ok(_) => {
                self.state = ProtocolState::Selected;
                if let Some(mailbox) = self.cache.mailbox() {
                    self.handler.on_mailbox_open(mailbox);
                }
                self.cache
                    .mailbox()
                    .ok_or_else(|| Error::Protocol("selected mailbox vanished".to_string()))
            }
            Err(err) => {
                // A failed re-selection deselects on most servers
                self.cache.close();
                if was_selected {
                    self.state = ProtocolState::Authenticated;
                    if let Some(previous) = previous {
                        self.handler.on_mailbox_close(&previous);
                    }
                }
                Err(err)
            }
        }
    }

    /// Closes the selected mailbox with CLOSE.
    ///
    /// No-op outside the selected state. Emits `mailbox_close`.
    pub async fn close(&mut self) -> Result<bool> {
        if !self.state.is_selected() {
            return Ok(false);
        }

        if let Err(err) = self.exec(&Command::Close).await {
            tracing::debug!(?err, "CLOSE failed");
        }

        self.state = ProtocolState::Authenticated;
        if let Some(mailbox) = self.cache.close() {
            self.handler.on_mailbox_close(&mailbox);
        }
        Ok(true)
    }

    /// Deselects without expunging via UNSELECT (RFC 3691).
    ///
    /// Falls back to CLOSE when the capability is missing.
    pub async fn unselect(&mut self) -> Result<bool> {
        if !self.state.is_selected() {
            return Ok(false);
        }
        if !self.has_capability(&Capability::Unselect) {
            return self.close().await;
        }

        if let Err(err) = self.exec(&Command::Unselect).await {
            tracing::debug!(?err, "UNSELECT failed");
        }

        self.state = ProtocolState::Authenticated;
        if let Some(mailbox) = self.cache.close() {
            self.handler.on_mailbox_close(&mailbox);
        }
        Ok(true)
    }

    /// Lists folders, merging LIST and LSUB into one tree.
    ///
    /// Prefers LIST; uses XLIST only when the server supports it but not
    /// SPECIAL-USE. Folders appearing only in LSUB are dropped. INBOX is
    /// always treated as subscribed with the `\Inbox` role.
    pub async fn list(&mut self, options: &ListOptions) -> Result<Vec<Folder>> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState("LIST requires authentication".to_string()));
        }

        let pattern = options.pattern.clone().unwrap_or_else(|| "*".to_string());
        let use_xlist = self.has_capability(&Capability::XList)
            && !self.has_capability(&Capability::SpecialUse);
        let list_status = options
            .status_items
            .clone()
            .filter(|_| self.has_capability(&Capability::ListStatus));

        let command = if use_xlist {
            Command::Xlist {
                reference: options.reference.clone(),
                pattern: pattern.clone(),
            }
        } else {
            Command::List {
                reference: options.reference.clone(),
                pattern: pattern.clone(),
                return_status: list_status.clone(),
            }
        };

        let result = self.exec(&command).await?.into_result()?;

        let utf8 = self.utf8_enabled();
        let mut folders: Vec<Folder> = Vec::new();
        let mut statuses: Vec<(Mailbox, Vec<StatusItem>)> = Vec::new();

        for response in result.untagged {
            match response {
                UntaggedResponse::Listing {
                    source: ListSource::List | ListSource::Xlist,
                    entry,
                } => {
                    folders.push(folder_from_entry(&entry, utf8, use_xlist));
                }
                UntaggedResponse::Status { mailbox, items } => statuses.push((mailbox, items)),
                _ => {}
            }
        }

        // Merge subscriptions; LSUB-only folders are not surfaced
        if !options.list_only {
            match self
                .exec(&Command::Lsub {
                    reference: options.reference.clone(),
                    pattern,
                })
                .await
            {
                Ok(result) if result.is_ok() => {
                    for response in result.untagged {
                        if let UntaggedResponse::Listing {
                            source: ListSource::Lsub,
                            entry,
                        } = response
                        {
                            let path = decode_path(entry.mailbox.as_str(), utf8);
                            if let Some(folder) =
                                folders.iter_mut().find(|f| f.path == path)
                            {
                                folder.subscribed = true;
                            }
                        }
                    }
                }
                Ok(_) | Err(_) => {
                    tracing::debug!("LSUB merge skipped");
                }
            }
        }

        for folder in &mut folders {
            // INBOX is implicitly subscribed and carries the inbox role
            if folder.path.eq_ignore_ascii_case("INBOX") {
                folder.path = "INBOX".to_string();
                folder.subscribed = true;
                folder.special_use = Some(MailboxAttribute::Inbox);
            }

            if let Some(hint) = options.special_use_hints.get(&folder.path) {
                folder.special_use = Some(hint.clone());
            } else if folder.special_use.is_none() {
                folder.special_use = special_use_for_name(&folder.name);
            }

            for (mailbox, items) in &statuses {
                if decode_path(mailbox.as_str(), utf8) == folder.path {
                    folder.status = Some(status_from_items(&folder.path, items));
                }
            }
        }

        // LIST-STATUS fallback: one STATUS round-trip per selectable folder
        if let Some(items) = options
            .status_items
            .clone()
            .filter(|_| list_status.is_none())
        {
            for folder in &mut folders {
                if folder.attributes.contains(&MailboxAttribute::NoSelect) {
                    continue;
                }
                let path = folder.path.clone();
                match self.status_inner(&path, &items).await {
                    Ok(status) => folder.status = Some(status),
                    Err(err) => folder.status_error = Some(err.to_string()),
                }
            }
        }

        sort_folders(&mut folders);
        self.folders.clone_from(&folders);
        Ok(folders)
    }

    /// Resolves the server's namespaces.
    ///
    /// Without the NAMESPACE capability, derives a single personal entry
    /// from `LIST "" ""`.
    pub async fn namespace(&mut self) -> Result<Namespaces> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "NAMESPACE requires authentication".to_string(),
            ));
        }

        let namespaces = if self.has_capability(&Capability::Namespace) {
            let result = self.exec(&Command::Namespace).await?.into_result()?;
            result
                .untagged
                .into_iter()
                .find_map(|u| match u {
                    UntaggedResponse::Namespace(ns) => Some(ns),
                    _ => None,
                })
                .unwrap_or_default()
        } else {
            let result = self
                .exec(&Command::List {
                    reference: String::new(),
                    pattern: String::new(),
                    return_status: None,
                })
                .await?
                .into_result()?;
            let delimiter = result.untagged.iter().find_map(|u| match u {
                UntaggedResponse::Listing { entry, .. } => entry.delimiter,
                _ => None,
            });
            Namespaces::fallback(delimiter)
        };

        self.namespaces = Some(namespaces.clone());
        Ok(namespaces)
    }

    /// Queries STATUS for a mailbox.
    ///
    /// HIGHESTMODSEQ is only requested when CONDSTORE is available. When
    /// the queried path is the selected mailbox, the values feed the cache
    /// (possibly emitting `exists`).
    pub async fn status(
        &mut self,
        path: &str,
        items: &[StatusAttribute],
    ) -> Result<MailboxStatus> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "STATUS requires authentication".to_string(),
            ));
        }

        let items: Vec<StatusAttribute> = items
            .iter()
            .copied()
            .filter(|item| {
                *item != StatusAttribute::HighestModSeq || self.condstore_enabled()
            })
            .collect();

        match self.status_inner(path, &items).await {
            Ok(status) => {
                self.apply_status_to_cache(&status);
                Ok(status)
            }
            Err(Error::CommandRejected { code, text }) => {
                // Corroborate with LIST before reporting a missing mailbox
                let missing = self.list_is_missing(path).await;
                if missing {
                    Err(Error::NotFound(path.to_string()))
                } else {
                    Err(Error::CommandRejected { code, text })
                }
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn status_inner(
        &mut self,
        path: &str,
        items: &[StatusAttribute],
    ) -> Result<MailboxStatus> {
        let wire_path = self.normalize(path);
        let result = self
            .exec(&Command::Status {
                mailbox: Mailbox::new(wire_path),
                items: items.to_vec(),
            })
            .await?
            .into_result()?;

        let mut status = MailboxStatus {
            path: path.to_string(),
            ..MailboxStatus::default()
        };

        for response in result.untagged {
            if let UntaggedResponse::Status { items, .. } = response {
                for item in items {
                    match item {
                        StatusItem::Messages(n) => status.messages = Some(n),
                        StatusItem::Recent(n) => status.recent = Some(n),
                        StatusItem::UidNext(uid) => status.uid_next = Some(uid),
                        StatusItem::UidValidity(v) => status.uid_validity = Some(v),
                        StatusItem::Unseen(n) => status.unseen = Some(n),
                        StatusItem::HighestModSeq(m) => status.highest_modseq = Some(m),
                    }
                }
            }
        }

        Ok(status)
    }

    fn apply_status_to_cache(&mut self, status: &MailboxStatus) {
        let Some(selected_path) = self.cache.mailbox().map(|m| m.path.clone()) else {
            return;
        };
        if selected_path != status.path {
            return;
        }

        if let Some(messages) = status.messages {
            self.cache
                .apply(&UntaggedResponse::Exists(messages), self.handler.as_mut());
        }
        if let Some(modseq) = status.highest_modseq {
            self.cache.apply_code(&ResponseCode::HighestModSeq(modseq));
        }
    }

    async fn list_is_missing(&mut self, path: &str) -> bool {
        let wire_path = self.normalize(path);
        match self
            .exec(&Command::List {
                reference: String::new(),
                pattern: wire_path,
                return_status: None,
            })
            .await
        {
            Ok(result) if result.is_ok() => !result
                .untagged
                .iter()
                .any(|u| matches!(u, UntaggedResponse::Listing { .. })),
            _ => false,
        }
    }

    /// Creates a mailbox, then subscribes to it best-effort.
    ///
    /// A NO with ALREADYEXISTS reports `created: false` instead of
    /// failing.
    pub async fn mailbox_create(&mut self, path: &str) -> Result<MailboxCreated> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "CREATE requires authentication".to_string(),
            ));
        }

        let wire_path = self.normalize(path);
        let result = self
            .exec(&Command::Create {
                mailbox: Mailbox::new(wire_path),
            })
            .await?;

        match result.status {
            Status::Ok => {
                let _ = self.mailbox_subscribe(path).await;
                Ok(MailboxCreated {
                    path: path.to_string(),
                    created: true,
                })
            }
            Status::No if result.code == Some(ResponseCode::AlreadyExists) => Ok(MailboxCreated {
                path: path.to_string(),
                created: false,
            }),
            _ => result.into_result().map(|_| MailboxCreated {
                path: path.to_string(),
                created: true,
            }),
        }
    }

    /// Deletes a mailbox, closing it first when it is selected.
    pub async fn mailbox_delete(&mut self, path: &str) -> Result<()> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "DELETE requires authentication".to_string(),
            ));
        }

        if self.selected_mailbox().is_some_and(|m| m.path == path) {
            self.close().await?;
        }

        let wire_path = self.normalize(path);
        self.exec(&Command::Delete {
            mailbox: Mailbox::new(wire_path),
        })
        .await?
        .into_result()?;
        Ok(())
    }

    /// Renames a mailbox, closing it first when it is selected.
    pub async fn mailbox_rename(&mut self, path: &str, new_path: &str) -> Result<RenameResult> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "RENAME requires authentication".to_string(),
            ));
        }

        if self.selected_mailbox().is_some_and(|m| m.path == path) {
            self.close().await?;
        }

        let from = self.normalize(path);
        let to = self.normalize(new_path);
        self.exec(&Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        })
        .await?
        .into_result()?;

        Ok(RenameResult {
            path: path.to_string(),
            new_path: new_path.to_string(),
        })
    }

    /// Subscribes to a mailbox, best-effort.
    pub async fn mailbox_subscribe(&mut self, path: &str) -> Result<bool> {
        if !self.state.is_authenticated() {
            return Ok(false);
        }

        let wire_path = self.normalize(path);
        match self
            .exec(&Command::Subscribe {
                mailbox: Mailbox::new(wire_path),
            })
            .await
        {
            Ok(result) => Ok(result.is_ok()),
            Err(err) => {
                tracing::debug!(?err, path, "SUBSCRIBE failed");
                Ok(false)
            }
        }
    }

    /// Unsubscribes from a mailbox, best-effort.
    pub async fn mailbox_unsubscribe(&mut self, path: &str) -> Result<bool> {
        if !self.state.is_authenticated() {
            return Ok(false);
        }

        let wire_path = self.normalize(path);
        match self
            .exec(&Command::Unsubscribe {
                mailbox: Mailbox::new(wire_path),
            })
            .await
        {
            Ok(result) => Ok(result.is_ok()),
            Err(err) => {
                tracing::debug!(?err, path, "UNSUBSCRIBE failed");
                Ok(false)
            }
        }
    }

    /// Fetches quota roots and their usage for a mailbox (RFC 2087).
    pub async fn quota(&mut self, path: &str) -> Result<Vec<crate::parser::QuotaResource>> {
        if !self.state.is_authenticated() || !self.has_capability(&Capability::Quota) {
            return Ok(Vec::new());
        }

        let wire_path = self.normalize(path);
        let result = self
            .exec(&Command::GetQuotaRoot {
                mailbox: Mailbox::new(wire_path),
            })
            .await?
            .into_result()?;

        let mut resources = Vec::new();
        let mut roots = Vec::new();
        for response in result.untagged {
            match response {
                UntaggedResponse::QuotaRoot { roots: r, .. } => roots.extend(r),
                UntaggedResponse::Quota { resources: r, .. } => resources.extend(r),
                _ => {}
            }
        }

        // Some servers answer GETQUOTAROOT with roots only
        if resources.is_empty() {
            for root in roots {
                let result = self
                    .exec(&Command::GetQuota { root })
                    .await?
                    .into_result()?;
                for response in result.untagged {
                    if let UntaggedResponse::Quota { resources: r, .. } = response {
                        resources.extend(r);
                    }
                }
            }
        }

        Ok(resources)
    }
}

/// Builds a folder record from one LIST/XLIST line.
fn folder_from_entry(entry: &ListResponse, utf8: bool, xlist: bool) -> Folder {
    let path_as_listed = entry.mailbox.as_str().to_string();
    let mut path = decode_path(&path_as_listed, utf8);

    // Strip a leading delimiter some servers emit for namespace roots
    if let Some(delimiter) = entry.delimiter
        && let Some(stripped) = path.strip_prefix(delimiter)
    {
        path = stripped.to_string();
    }

    let (parent, name) = split_path(&path, entry.delimiter);

    let mut attributes = entry.attributes.clone();
    let mut special_use = attributes.iter().find(|a| a.is_special_use()).cloned();

    if xlist {
        // XLIST marks the inbox with a \Inbox flag; keep it as a role,
        // not as an attribute
        if attributes.contains(&MailboxAttribute::Inbox) {
            attributes.retain(|a| *a != MailboxAttribute::Inbox);
            special_use = Some(MailboxAttribute::Inbox);
        }
    }

    Folder {
        path,
        path_as_listed,
        name,
        parent,
        delimiter: entry.delimiter,
        attributes,
        special_use,
        listed: true,
        subscribed: false,
        status: None,
        status_error: None,
    }
}

fn status_from_items(path: &str, items: &[StatusItem]) -> MailboxStatus {
    let mut status = MailboxStatus {
        path: path.to_string(),
        ..MailboxStatus::default()
    };
    for item in items {
        match item {
            StatusItem::Messages(n) => status.messages = Some(*n),
            StatusItem::Recent(n) => status.recent = Some(*n),
            StatusItem::UidNext(uid) => status.uid_next = Some(*uid),
            StatusItem::UidValidity(v) => status.uid_validity = Some(*v),
            StatusItem::Unseen(n) => status.unseen = Some(*n),
            StatusItem::HighestModSeq(m) => status.highest_modseq = Some(*m),
        }
    }
    status
}
