//! `Engine` (`spec.md` §6's "Engine API surface"): the one type a host actually
//! drives. Wraps an [`Account`] (tree + cache + task graph + sessions) and exposes
//! `open_account`, `list_mailboxes`, `open_mailbox`, `fetch_messages`, `fetch_part`,
//! `search`, `thread`, `set_flags`, `send_message`, `subscribe_observer` exactly as
//! named in `SPEC_FULL.md` §4.10.
//!
//! Grounded on `aero-proto::imap::session::Instance`
//! (`examples/deuxfleurs-org-aerogramme/aero-proto/src/imap/session.rs`) for the
//! "one state machine per connection, commands drive the task graph" shape, adapted
//! here to a client driving one primary session per account rather than a server
//! dispatching to many.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use imap_codec::imap_types::core::Charset;
use imap_codec::imap_types::core::NonEmptyVec;
use imap_codec::imap_types::fetch::MacroOrMessageDataItemNames;
use imap_codec::imap_types::flag::Flag;
use imap_codec::imap_types::search::SearchKey;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use tokio::sync::mpsc;

use trove_model::tree::{MailboxNode, MessageNode, MsgListNode, PartNode};
use trove_model::{Attr, Cache, Fetched, MailboxKey, MailboxMeta, MailboxName, MessageKey, Node, NodeId, PartKey};
use trove_tasks::tasks::{append, connect, fetch as fetch_task, keep_open, mailbox_ops, search as search_task, store};
use trove_tasks::{Session, TaskGraph, TaskId, Termination, Transport};
use trove_thread::ThreadProxy;
use trove_wire::{BodyStructurePart, Fetch, FetchAttr, Response, Status, ThreadAlgorithm, WriteStep};

use crate::account::{Account, SessionId};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Named interface to the SMTP (or other outgoing-mail) collaborator `spec.md` §1
/// places out of scope: `Engine::send_message` appends the composed bytes into the
/// sent-mailbox itself (an in-scope IMAP action), then hands the same bytes and
/// envelope-recipient list to whatever is registered here, if anything.
#[async_trait]
pub trait OutgoingTransport: Send + Sync {
    async fn submit(&self, message: &[u8], recipients: &[String]) -> Result<(), EngineError>;
}

/// Ties one account's mailbox tree, cache, task graph, sessions, and threading
/// proxy together behind the host-facing operations.
pub struct Engine<T: Transport> {
    config: EngineConfig,
    account: Account<T>,
    primary: Option<SessionId>,
    keep_open: Option<keep_open::KeepMailboxOpen>,
    mailbox_events: Option<mpsc::UnboundedReceiver<keep_open::MailboxEvent>>,
    thread_proxy: ThreadProxy,
    outgoing_transport: Option<Box<dyn OutgoingTransport>>,
    mailbox_nodes: HashMap<String, NodeId>,
    current_mailbox: Option<MailboxKey>,
    msg_list_node: Option<NodeId>,
    offline: bool,
    /// The most recently completed task, threaded in as the next task's sole
    /// parent so [`TaskGraph::next_ready`] reflects real causal ordering (`spec.md`
    /// §4.7's FIFO dependency scheduling) instead of every task starting parentless.
    /// Reset to `None` whenever the chain breaks (a task failed, or there's nothing
    /// yet to depend on).
    last_task: Option<TaskId>,
    /// The long-lived task representing "keep this mailbox open, issuing NOOP/IDLE
    /// between child commands" (C8). Stays `Active` for as long as a mailbox is
    /// open; [`Self::close_mailbox`] requests its abort before tearing it down.
    keep_open_task: Option<TaskId>,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: EngineConfig, cache: Arc<dyn Cache>) -> Self {
        Self {
            config,
            account: Account::new(cache),
            primary: None,
            keep_open: None,
            mailbox_events: None,
            thread_proxy: ThreadProxy::new(),
            outgoing_transport: None,
            mailbox_nodes: HashMap::new(),
            current_mailbox: None,
            msg_list_node: None,
            offline: false,
            last_task: None,
            keep_open_task: None,
        }
    }

    /// An engine that never touches a transport: every operation fails fast with
    /// [`EngineError::Offline`], mirroring `OfflineConnection` (`spec.md` §4.7) at
    /// the API surface rather than the task-graph layer.
    pub fn offline(config: EngineConfig, cache: Arc<dyn Cache>) -> Self {
        let mut engine = Self::new(config, cache);
        engine.offline = true;
        engine
    }

    pub fn set_outgoing_transport(&mut self, transport: Box<dyn OutgoingTransport>) {
        self.outgoing_transport = Some(transport);
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.account.graph
    }

    pub fn tree(&self) -> &trove_model::Tree {
        &self.account.tree
    }

    /// Spawns a task named `name`, chaining it off [`Self::last_task`] when that
    /// task actually completed (an engine call after a failure starts a fresh
    /// chain rather than depending on a parent that will never resolve `Completed`
    /// again), then drives it out of [`TaskGraph::next_ready`] and marks it active.
    /// Every `Engine` operation is spawned and resolved through this pair of
    /// helpers and [`Self::finish_task_ok`]/[`Self::finish_task_err`] so the graph
    /// is the actual scheduler, not bookkeeping on the side.
    fn begin_task(&mut self, name: &'static str) -> TaskId {
        let graph = &mut self.account.graph;
        let parents = match self.last_task {
            Some(prev) if matches!(graph.termination(prev), Some(Termination::Completed)) => {
                vec![prev]
            }
            _ => Vec::new(),
        };
        graph.spawn(name, parents);
        let id = graph
            .next_ready()
            .expect("a task spawned with already-satisfied parents is always ready");
        graph.mark_active(id);
        id
    }

    fn finish_task_ok(&mut self, id: TaskId) {
        self.account.graph.complete(id);
        self.last_task = Some(id);
    }

    fn finish_task_err(&mut self, id: TaskId, err: trove_tasks::TaskError) {
        self.account.graph.fail(id, err);
        self.last_task = None;
    }

    fn session(&mut self) -> Result<&mut Session<T>, EngineError> {
        let id = self
            .primary
            .ok_or_else(|| EngineError::Transport("no active session".to_string()))?;
        self.account
            .session_mut(id)
            .ok_or_else(|| EngineError::Transport("session was removed".to_string()))
    }

    /// `openAccount` (`spec.md` §6): drives `OpenConnection` (C7) to completion over
    /// a caller-supplied transport, moving the session from `Initial` to `Auth`.
    pub async fn open_account(&mut self, transport: T, already_encrypted: bool) -> Result<(), EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let session = Session::new(transport);
        let id = self.account.add_session(session);
        self.primary = Some(id);

        let task = self.begin_task("open-connection");
        let creds = connect::Credentials {
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };
        match connect::open_connection(self.session()?, &creds, already_encrypted).await {
            Ok(()) => {
                self.finish_task_ok(task);
                Ok(())
            }
            Err(err) => {
                self.finish_task_err(task, err.clone());
                Err(err.into())
            }
        }
    }

    /// `listMailboxes(parent)` (`spec.md` §6): `LIST reference "%"`, refreshing the
    /// cache and the tree's child list for `parent` in one contiguous burst.
    pub async fn list_mailboxes(&mut self, parent: &str) -> Result<Vec<MailboxMeta>, EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let task = self.begin_task("list-mailboxes");

        let listed = match mailbox_ops::list(self.session()?, parent, "%").await {
            Ok(l) => l,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };

        let metas: Vec<MailboxMeta> = listed
            .into_iter()
            .map(|entry| MailboxMeta {
                name: MailboxName(entry.name.clone()),
                subscribed: entry
                    .attributes
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(r"\Subscribed")),
                has_children: !entry
                    .attributes
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(r"\HasNoChildren")),
                hierarchy_separator: entry.delimiter,
            })
            .collect();

        self.account
            .cache
            .set_child_mailboxes(parent, metas.clone())
            .await;

        let parent_node = if parent.is_empty() {
            self.account.tree.root()
        } else {
            self.ensure_mailbox_node(parent)
        };
        let children: Vec<Node> = metas
            .iter()
            .cloned()
            .map(|meta| {
                Node::Mailbox(MailboxNode {
                    meta,
                    children_fresh: false,
                    children: Vec::new(),
                    msg_list: None,
                })
            })
            .collect();
        self.account.tree.replace_children(parent_node, children);
        self.index_mailbox_children(parent_node);

        self.finish_task_ok(task);
        Ok(metas)
    }

    /// `openMailbox(name)` (`spec.md` §6): `SELECT`/`EXAMINE` then a `UID SEARCH
    /// ALL` to seed the tree's authoritative UID ordering, per the `MsgListNode`
    /// contract in `spec.md` §3. Only one mailbox may be open per engine at a time;
    /// call [`Self::close_mailbox`] first to switch.
    pub async fn open_mailbox(&mut self, name: &str, read_only: bool) -> Result<(), EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        if self.keep_open.is_some() {
            return Err(EngineError::ProtocolViolation(
                "a mailbox is already open; close it before selecting another".to_string(),
            ));
        }

        let task = self.begin_task("open-mailbox");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let keep_open = keep_open::KeepMailboxOpen::new(name.to_string(), events_tx);
        let uid_validity = match keep_open.select(self.session()?, read_only).await {
            Ok(v) => v.unwrap_or(0),
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };

        let mailbox_key = MailboxKey {
            name: MailboxName(name.to_string()),
            uid_validity,
        };
        let mut uids = match search_task::search(self.session()?, SearchKey::All, true).await {
            Ok(u) => u,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };
        uids.sort_unstable();

        self.account
            .cache
            .set_uid_mapping(&mailbox_key, uids.clone(), uid_validity)
            .await;

        let mailbox_node = self.ensure_mailbox_node(name);
        let msg_list_id = self.account.tree.append_child(
            mailbox_node,
            Node::MsgList(MsgListNode {
                mailbox: mailbox_key.clone(),
                messages: Vec::new(),
            }),
        );
        let message_nodes = uids
            .iter()
            .map(|&uid| new_message_node(mailbox_key.clone(), uid))
            .collect();
        self.account.tree.replace_children(msg_list_id, message_nodes);
        if let Some(Node::Mailbox(node)) = self.account.tree.get_mut(mailbox_node) {
            node.msg_list = Some(msg_list_id);
        }

        self.keep_open = Some(keep_open);
        self.mailbox_events = Some(events_rx);
        self.current_mailbox = Some(mailbox_key);
        self.msg_list_node = Some(msg_list_id);

        self.finish_task_ok(task);
        // C8: a long-lived child of `open-mailbox` that stays `Active` for as long
        // as the mailbox is open. `run_keep_open` drives it; `close_mailbox` aborts
        // and resolves it.
        let keep_open_task = self.account.graph.spawn("keep-open", vec![task]);
        self.account.graph.mark_active(keep_open_task);
        self.keep_open_task = Some(keep_open_task);
        Ok(())
    }

    /// Drives one NOOP/IDLE round for the currently open mailbox's keep-open task
    /// (C8), unless it has been asked to abort (by [`Self::close_mailbox`]), in
    /// which case this resolves the task and does nothing else. A host polling an
    /// otherwise-idle connection calls this in its own loop between other `Engine`
    /// operations; each call is one round, i.e. one tagged boundary, so a pending
    /// abort is always observed before the next command goes out.
    pub async fn run_keep_open(&mut self) -> Result<(), EngineError> {
        let Some(task) = self.keep_open_task else {
            return Ok(());
        };
        if self.account.graph.abort_requested(task) {
            self.account.graph.complete(task);
            self.keep_open_task = None;
            return Ok(());
        }
        let Some(keep_open) = self.keep_open.take() else {
            self.keep_open_task = None;
            return Ok(());
        };
        let result = keep_open.run_round_unless_aborted(self.session()?, false).await;
        self.keep_open = Some(keep_open);
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.account.graph.fail(task, err.clone());
                self.keep_open_task = None;
                Err(err.into())
            }
        }
    }

    /// Releases the currently open mailbox (`CLOSE`), so a different one may be
    /// opened. Not named in `spec.md` §6 directly, but required to satisfy the
    /// "exactly one `KeepMailboxOpen` per session" invariant it documents for C7/C8.
    pub async fn close_mailbox(&mut self) -> Result<(), EngineError> {
        let Some(keep_open) = self.keep_open.take() else {
            return Ok(());
        };
        if let Some(task) = self.keep_open_task.take() {
            self.account.graph.request_abort(task);
            self.account.graph.complete(task);
        }
        let result = keep_open.close(self.session()?).await;
        self.mailbox_events = None;
        self.current_mailbox = None;
        self.msg_list_node = None;
        result.map_err(EngineError::from)
    }

    /// Drains whatever `EXISTS`/`EXPUNGE`/flag-change/`VANISHED` data arrived on the
    /// currently open mailbox's keep-open channel since the last call, applying each
    /// to the cache and tree before returning the raw events for the host to act on
    /// (e.g. re-running `fetch_messages` over newly-`EXISTS`ed sequence numbers).
    pub async fn pump_mailbox_events(&mut self) -> Vec<keep_open::MailboxEvent> {
        let mut drained = Vec::new();
        if let Some(rx) = self.mailbox_events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                drained.push(event);
            }
        }
        for event in drained.clone() {
            self.apply_mailbox_event(event).await;
        }
        drained
    }

    /// `fetchMessages(range)` (`spec.md` §6): runs `FETCH`/`UID FETCH` and folds
    /// every returned attribute into the cache and the currently open mailbox's
    /// tree nodes.
    pub async fn fetch_messages(
        &mut self,
        sequence_set: SequenceSet,
        uid: bool,
        items: MacroOrMessageDataItemNames<'static>,
    ) -> Result<Vec<Fetch>, EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let task = self.begin_task("fetch");
        let fetches = match fetch_task::fetch(self.session()?, sequence_set, uid, items).await {
            Ok(f) => f,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };
        for fetch in fetches.clone() {
            self.apply_fetch(fetch).await;
        }
        self.finish_task_ok(task);
        Ok(fetches)
    }

    /// `fetchPart(msg, path)` (`spec.md` §6): cache-first (the cache contract is the
    /// source of truth for already-downloaded bytes), falling back to `UID FETCH
    /// (BODY.PEEK[path])`. The command line is hand-built (as `trove-tasks::tasks::
    /// search`'s `SORT`/`THREAD` already do) since an arbitrary dotted section path
    /// doesn't map onto a single convenient `imap-codec` constructor.
    pub async fn fetch_part(&mut self, uid: u32, part_path: &str) -> Result<Vec<u8>, EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let mailbox = self
            .current_mailbox
            .clone()
            .ok_or_else(|| EngineError::ProtocolViolation("no mailbox selected".to_string()))?;
        let part_key = PartKey {
            message: MessageKey {
                mailbox: mailbox.clone(),
                uid,
            },
            path: part_path.to_string(),
        };
        if let Some(bytes) = self.account.cache.message_part(&part_key).await {
            return Ok(bytes);
        }

        let task = self.begin_task("fetch-part");
        let bytes = match self.fetch_part_raw(uid, part_path).await {
            Ok(b) => b,
            Err(err) => {
                self.finish_task_err(task, trove_tasks::TaskError::ProtocolViolation(err.to_string()));
                return Err(err);
            }
        };
        self.account
            .cache
            .set_message_part(&part_key, bytes.clone())
            .await;
        if let Some(id) = self.message_node_id(uid) {
            self.account.tree.notify_changed(id, Attr::PartBytes);
        }
        self.finish_task_ok(task);
        Ok(bytes)
    }

    async fn fetch_part_raw(&mut self, uid: u32, part_path: &str) -> Result<Vec<u8>, EngineError> {
        let tag = format!("{}", self.session()?.command_builder().noop().tag);
        let line = format!("{tag} UID FETCH {uid} (BODY.PEEK[{part_path}])\r\n");
        let session = self.session()?;
        session
            .write_steps(vec![WriteStep::Send(line.into_bytes())])
            .await?;
        let mut data = None;
        loop {
            match session.read_one_response().await? {
                Response::State(state) if state.tag.as_deref() == Some(tag.as_str()) => {
                    return match state.status {
                        Status::Ok => data.ok_or_else(|| {
                            EngineError::ProtocolViolation(
                                "server completed FETCH without returning BODY data".to_string(),
                            )
                        }),
                        _ => Err(EngineError::CommandFailed(state.text)),
                    };
                }
                Response::Fetch(fetch) => {
                    for attr in fetch.attrs {
                        if let FetchAttr::Body { data: bytes, .. } = attr {
                            data = Some(bytes);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `search(criteria)` (`spec.md` §6): `SEARCH`/`UID SEARCH`.
    pub async fn search(&mut self, criteria: SearchKey<'static>, uid: bool) -> Result<Vec<u32>, EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let task = self.begin_task("search");
        match search_task::search(self.session()?, criteria, uid).await {
            Ok(uids) => {
                self.finish_task_ok(task);
                Ok(uids)
            }
            Err(err) => {
                self.finish_task_err(task, err.clone());
                Err(err.into())
            }
        }
    }

    /// `thread(algorithm, criteria)` (`spec.md` §6): runs `THREAD`, then replays the
    /// result through [`ThreadProxy::apply_thread`] against the currently open
    /// mailbox's UID list, preserving stable `internalId`s across re-threading.
    pub async fn thread(
        &mut self,
        algorithm: ThreadAlgorithm,
        charset: &Charset<'static>,
        search_program: &str,
    ) -> Result<(), EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let task = self.begin_task("thread");
        let nodes = match search_task::thread(self.session()?, algorithm, charset, search_program).await {
            Ok(n) => n,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };
        let source_uids = self.current_mailbox_uids();
        self.thread_proxy.apply_thread(&source_uids, &nodes);
        self.finish_task_ok(task);
        Ok(())
    }

    pub fn thread_proxy(&self) -> &ThreadProxy {
        &self.thread_proxy
    }

    /// `setFlags(msgs, add|remove|replace, flag)` (`spec.md` §6): `STORE`/`UID
    /// STORE`, requesting the non-silent echo so the returned `FETCH FLAGS` lines
    /// can update the cache and tree the same way `fetch_messages` does.
    pub async fn set_flags(
        &mut self,
        sequence_set: SequenceSet,
        uid: bool,
        op: store::StoreOp,
        flags: Vec<Flag<'static>>,
    ) -> Result<(), EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let task = self.begin_task("store");
        let fetches = match store::store(self.session()?, sequence_set, uid, op, false, flags).await {
            Ok(f) => f,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };
        for fetch in fetches {
            self.apply_fetch(fetch).await;
        }
        self.finish_task_ok(task);
        Ok(())
    }

    /// `sendMessage(composedBytes, recipients)` (`spec.md` §6). The SMTP transport
    /// itself is out of scope (`spec.md` §1 names it as an external collaborator);
    /// this appends the composed message into `sent_mailbox` (the only outgoing-mail
    /// action that is in scope for an IMAP engine) and, if a collaborator is
    /// registered via [`Self::set_outgoing_transport`], hands it the same bytes and
    /// envelope-recipient list for actual submission.
    pub async fn send_message(
        &mut self,
        composer: &trove_compose::Composer,
        sent_mailbox: &str,
    ) -> Result<append::AppendedUid, EngineError> {
        if self.offline {
            return Err(EngineError::Offline);
        }
        let bytes = composer.build()?;
        let recipients = composer.envelope_recipients();

        let task = self.begin_task("send-message");
        let appended = match append::append(
            self.session()?,
            sent_mailbox,
            vec![Flag::Seen],
            None,
            bytes.clone(),
        )
        .await
        {
            Ok(a) => a,
            Err(err) => {
                self.finish_task_err(task, err.clone());
                return Err(err.into());
            }
        };

        if let Some(transport) = &self.outgoing_transport {
            transport.submit(&bytes, &recipients).await?;
        }

        self.finish_task_ok(task);
        Ok(appended)
    }

    /// `subscribeObserver(callback)` (`spec.md` §6), for the mailbox tree.
    pub fn subscribe_observer(&mut self, observer: Box<dyn trove_model::Observer>) {
        self.account.tree.register_observer(observer);
    }

    /// The threading proxy has its own observer surface (`ThreadObserver`, distinct
    /// from the tree's `Observer`, per `spec.md` §4.8): exposed separately so a host
    /// can watch re-threading bursts without also watching every tree mutation.
    pub fn subscribe_thread_observer(&mut self, observer: Box<dyn trove_thread::ThreadObserver>) {
        self.thread_proxy.register_observer(observer);
    }

    fn ensure_mailbox_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.mailbox_nodes.get(name) {
            return id;
        }
        let root = self.account.tree.root();
        let id = self.account.tree.append_child(
            root,
            Node::Mailbox(MailboxNode {
                meta: MailboxMeta {
                    name: MailboxName(name.to_string()),
                    subscribed: false,
                    has_children: false,
                    hierarchy_separator: None,
                },
                children_fresh: false,
                children: Vec::new(),
                msg_list: None,
            }),
        );
        self.mailbox_nodes.insert(name.to_string(), id);
        id
    }

    fn index_mailbox_children(&mut self, parent_node: NodeId) {
        let child_ids: Vec<NodeId> = match self.account.tree.get(parent_node) {
            Some(Node::Root(root)) => root.children.clone(),
            Some(Node::Mailbox(node)) => node.children.clone(),
            _ => return,
        };
        for id in child_ids {
            if let Some(Node::Mailbox(node)) = self.account.tree.get(id) {
                self.mailbox_nodes.insert(node.meta.name.0.clone(), id);
            }
        }
    }

    fn uid_for_seq(&self, seq: u32) -> Option<u32> {
        let msg_list = self.msg_list_node?;
        let Node::MsgList(list) = self.account.tree.get(msg_list)? else {
            return None;
        };
        let index = (seq as usize).checked_sub(1)?;
        let id = *list.messages.get(index)?;
        match self.account.tree.get(id) {
            Some(Node::Message(message)) => Some(message.key.uid),
            _ => None,
        }
    }

    fn message_node_id(&self, uid: u32) -> Option<NodeId> {
        let msg_list = self.msg_list_node?;
        let Node::MsgList(list) = self.account.tree.get(msg_list)? else {
            return None;
        };
        list.messages.iter().copied().find(|&id| {
            matches!(self.account.tree.get(id), Some(Node::Message(m)) if m.key.uid == uid)
        })
    }

    fn current_mailbox_uids(&self) -> Vec<u32> {
        let Some(msg_list) = self.msg_list_node else {
            return Vec::new();
        };
        match self.account.tree.get(msg_list) {
            Some(Node::MsgList(list)) => list
                .messages
                .iter()
                .filter_map(|id| match self.account.tree.get(*id) {
                    Some(Node::Message(m)) => Some(m.key.uid),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Rebuilds the open mailbox's `MsgListNode` from scratch with `remaining_uids`,
    /// as one contiguous remove-then-insert burst. Used for `EXPUNGE`/`VANISHED`:
    /// the tree only exposes whole-list replacement (`spec.md` §4.6's "atomic,
    /// contiguous" notification contract), not single-index removal, so individual
    /// messages are dropped by reconstructing the surviving set rather than patched
    /// in place. Already-fetched attributes for surviving messages are re-fetched
    /// lazily (they go back to `Fetched::Unknown`) rather than carried over.
    fn rebuild_msg_list(&mut self, remaining_uids: Vec<u32>) {
        let (Some(msg_list), Some(mailbox)) = (self.msg_list_node, self.current_mailbox.clone()) else {
            return;
        };
        let nodes = remaining_uids
            .iter()
            .map(|&uid| new_message_node(mailbox.clone(), uid))
            .collect();
        self.account.tree.replace_children(msg_list, nodes);
    }

    async fn apply_mailbox_event(&mut self, event: keep_open::MailboxEvent) {
        match event {
            keep_open::MailboxEvent::Exists(_) | keep_open::MailboxEvent::Recent(_) => {
                // New-message-count signal only; the host re-runs fetch/search over
                // the newly extended sequence range to learn the new UID(s).
            }
            keep_open::MailboxEvent::Expunge(seq) => {
                if let Some(uid) = self.uid_for_seq(seq) {
                    let remaining: Vec<u32> = self
                        .current_mailbox_uids()
                        .into_iter()
                        .filter(|&u| u != uid)
                        .collect();
                    if let Some(mailbox) = self.current_mailbox.clone() {
                        self.account
                            .cache
                            .set_uid_mapping(&mailbox, remaining.clone(), mailbox.uid_validity)
                            .await;
                    }
                    self.rebuild_msg_list(remaining);
                }
            }
            keep_open::MailboxEvent::Vanished { uids, .. } => {
                let vanished: std::collections::HashSet<u32> = uids.into_iter().collect();
                let remaining: Vec<u32> = self
                    .current_mailbox_uids()
                    .into_iter()
                    .filter(|u| !vanished.contains(u))
                    .collect();
                if let Some(mailbox) = self.current_mailbox.clone() {
                    self.account
                        .cache
                        .set_uid_mapping(&mailbox, remaining.clone(), mailbox.uid_validity)
                        .await;
                }
                self.rebuild_msg_list(remaining);
            }
            keep_open::MailboxEvent::FlagsChanged { seq, flags } => {
                if let (Some(uid), Some(mailbox)) = (self.uid_for_seq(seq), self.current_mailbox.clone()) {
                    let key = MessageKey { mailbox, uid };
                    self.account.cache.set_flags(&key, flags.clone()).await;
                    if let Some(id) = self.message_node_id(uid) {
                        if let Some(Node::Message(message)) = self.account.tree.get_mut(id) {
                            message.flags = Fetched::Known(flags);
                        }
                        self.account.tree.notify_changed(id, Attr::Flags);
                    }
                }
            }
        }
    }

    async fn apply_fetch(&mut self, fetch: Fetch) {
        let Some(mailbox) = self.current_mailbox.clone() else {
            return;
        };
        let uid = fetch
            .attrs
            .iter()
            .find_map(|a| match a {
                FetchAttr::Uid(uid) => Some(*uid),
                _ => None,
            })
            .or_else(|| self.uid_for_seq(fetch.seq));
        let Some(uid) = uid else { return };
        let key = MessageKey { mailbox, uid };
        let node_id = self.message_node_id(uid);

        for attr in fetch.attrs {
            match attr {
                FetchAttr::Uid(_) | FetchAttr::ModSeq(_) => {}
                FetchAttr::Flags(flags) => {
                    self.account.cache.set_flags(&key, flags.clone()).await;
                    if let Some(id) = node_id {
                        if let Some(Node::Message(m)) = self.account.tree.get_mut(id) {
                            m.flags = Fetched::Known(flags);
                        }
                        self.account.tree.notify_changed(id, Attr::Flags);
                    }
                }
                FetchAttr::Envelope(envelope) => {
                    self.account.cache.set_envelope(&key, envelope.clone()).await;
                    if let Some(id) = node_id {
                        if let Some(Node::Message(m)) = self.account.tree.get_mut(id) {
                            m.envelope = Fetched::Known(envelope);
                        }
                        self.account.tree.notify_changed(id, Attr::Envelope);
                    }
                }
                FetchAttr::InternalDate(date) => {
                    self.account.cache.set_internal_date(&key, date.clone()).await;
                    if let Some(id) = node_id {
                        if let Some(Node::Message(m)) = self.account.tree.get_mut(id) {
                            m.internal_date = Fetched::Known(date);
                        }
                        self.account.tree.notify_changed(id, Attr::InternalDate);
                    }
                }
                FetchAttr::Rfc822Size(size) => {
                    self.account.cache.set_size(&key, size).await;
                    if let Some(id) = node_id {
                        if let Some(Node::Message(m)) = self.account.tree.get_mut(id) {
                            m.size_octets = Fetched::Known(size);
                        }
                        self.account.tree.notify_changed(id, Attr::Size);
                    }
                }
                FetchAttr::BodyStructure(structure) => {
                    self.account.cache.set_body_structure(&key, structure.clone()).await;
                    if let Some(id) = node_id {
                        let parts = flatten_parts(&key, &structure, "");
                        self.account.tree.replace_children(
                            id,
                            parts.into_iter().map(Node::Part).collect(),
                        );
                        if let Some(Node::Message(m)) = self.account.tree.get_mut(id) {
                            m.body_structure = Fetched::Known(());
                        }
                        self.account.tree.notify_changed(id, Attr::BodyStructure);
                    }
                }
                FetchAttr::Body { section, data } => {
                    let part_key = PartKey {
                        message: key.clone(),
                        path: section,
                    };
                    self.account.cache.set_message_part(&part_key, data).await;
                    if let Some(id) = node_id {
                        self.account.tree.notify_changed(id, Attr::PartBytes);
                    }
                }
            }
        }
    }
}

/// Walks a `BODYSTRUCTURE` tree into the flat list of leaf `Part`s it describes, per
/// `spec.md` §3 ("Parts form a tree under their Message") and §6's dotted-path naming
/// (`"1"`, `"1.2"`, ...). Multipart containers are not addressable parts in their own
/// right under RFC 3501 numbering (only `.MIME`/`.HEADER` suffixes on a leaf are), so
/// only leaves become `Node::Part`s; numbering increments per nesting level exactly as
/// the wire format does.
fn flatten_parts(message: &MessageKey, structure: &BodyStructurePart, prefix: &str) -> Vec<PartNode> {
    match structure {
        BodyStructurePart::Single(part) => vec![PartNode {
            key: PartKey {
                message: message.clone(),
                path: if prefix.is_empty() {
                    "1".to_string()
                } else {
                    prefix.to_string()
                },
            },
            media_type: part.media_type.clone(),
            media_subtype: part.media_subtype.clone(),
            encoding: part.encoding.clone(),
            size_octets: part.size_octets,
            disposition: part.disposition.as_ref().map(|(kind, _)| kind.clone()),
            children: Vec::new(),
            bytes: Fetched::Unknown,
        }],
        BodyStructurePart::Multipart { children, .. } => children
            .iter()
            .enumerate()
            .flat_map(|(i, child)| {
                let path = if prefix.is_empty() {
                    format!("{}", i + 1)
                } else {
                    format!("{}.{}", prefix, i + 1)
                };
                flatten_parts(message, child, &path)
            })
            .collect(),
    }
}

fn new_message_node(mailbox: MailboxKey, uid: u32) -> Node {
    Node::Message(MessageNode {
        key: MessageKey { mailbox, uid },
        seq: None,
        flags: Fetched::Unknown,
        envelope: Fetched::Unknown,
        body_structure: Fetched::Unknown,
        internal_date: Fetched::Unknown,
        size_octets: Fetched::Unknown,
        parts: Vec::new(),
    })
}

/// Builds a single-element `SequenceSet` for one UID/sequence number, used by
/// callers that want to `fetch_messages`/`set_flags` one message at a time.
pub fn single_sequence(n: u32) -> Result<SequenceSet, EngineError> {
    let value = NonZeroU32::try_from(n)
        .map_err(|_| EngineError::ProtocolViolation("sequence number must be nonzero".to_string()))?;
    Ok(SequenceSet(
        NonEmptyVec::try_from(vec![Sequence::Single(SeqOrUid::Value(value))])
            .expect("single-element vec is always non-empty"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_wire::SinglePart;

    fn key() -> MessageKey {
        MessageKey {
            mailbox: MailboxKey {
                name: MailboxName::from("INBOX"),
                uid_validity: 1,
            },
            uid: 42,
        }
    }

    fn leaf(media_type: &str, media_subtype: &str) -> BodyStructurePart {
        BodyStructurePart::Single(SinglePart {
            media_type: media_type.to_string(),
            media_subtype: media_subtype.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn single_part_message_gets_path_one() {
        let structure = leaf("text", "plain");
        let parts = flatten_parts(&key(), &structure, "");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].key.path, "1");
        assert_eq!(parts[0].media_subtype, "plain");
    }

    #[test]
    fn nested_multipart_yields_dotted_paths_and_no_container_nodes() {
        // multipart/mixed(text/plain, multipart/alternative(text/plain, text/html))
        let structure = BodyStructurePart::Multipart {
            subtype: "mixed".to_string(),
            children: vec![
                leaf("text", "plain"),
                BodyStructurePart::Multipart {
                    subtype: "alternative".to_string(),
                    children: vec![leaf("text", "plain"), leaf("text", "html")],
                },
            ],
        };

        let parts = flatten_parts(&key(), &structure, "");
        let paths: Vec<&str> = parts.iter().map(|p| p.key.path.as_str()).collect();

        // Leaves only: the two multipart containers never become their own node.
        assert_eq!(paths, vec!["1", "2.1", "2.2"]);
        assert_eq!(parts[1].media_subtype, "plain");
        assert_eq!(parts[2].media_subtype, "html");
    }

    #[test]
    fn every_flattened_part_is_scoped_to_the_given_message() {
        let structure = leaf("image", "png");
        let parts = flatten_parts(&key(), &structure, "");
        assert_eq!(parts[0].key.message, key());
    }
}
