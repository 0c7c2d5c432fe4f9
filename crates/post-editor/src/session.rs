//! One editing session: the document, its metadata, and the timers and
//! listeners hanging off them.

use std::time::Instant;

use buletin_post_core::{
    ActiveFormatSet, Document, Editor, FormatEngine, FormatId, FormatOutcome, Node, PluginRegistry,
    Point, PostType, Selection, UrlPrompt, has_paid_marker, set_post_type, to_html,
};
use serde_json::json;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::metadata::PostMetadata;
use crate::payload::{AutosaveSnapshot, SubmitKind, SubmitPayload};
use crate::schedule::Debouncer;
use crate::slug::url_preview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ActiveFormatsChanged(ActiveFormatSet),
    Autosaved(AutosaveSnapshot),
    Submitted(SubmitPayload),
    PostTypeChanged(PostType),
}

type Listener = Box<dyn FnMut(&SessionEvent)>;

pub struct PostEditorSession {
    config: SessionConfig,
    editor: Editor,
    engine: FormatEngine,
    metadata: PostMetadata,
    active: ActiveFormatSet,
    autosave: Debouncer<()>,
    autosaved_indicator: Debouncer<()>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
    closed: bool,
}

impl PostEditorSession {
    /// A fresh free post with a single empty paragraph.
    pub fn new(config: SessionConfig) -> Self {
        let editor = Editor::with_config(
            Document {
                children: vec![Node::paragraph("")],
            },
            Selection::collapsed(Point::new(vec![0, 0], 0)),
            PluginRegistry::post(),
            config.editor.clone(),
        );
        Self::from_parts(config, editor, PostMetadata::default())
    }

    /// Resume editing `doc`. The paid marker is brought in line with
    /// `metadata.post_type` before the session starts.
    pub fn with_document(
        config: SessionConfig,
        doc: Document,
        metadata: PostMetadata,
    ) -> Result<Self, SessionError> {
        let mut editor = Editor::with_config(
            doc,
            Selection::collapsed(Point::new(vec![0, 0], 0)),
            PluginRegistry::post(),
            config.editor.clone(),
        );
        if has_paid_marker(editor.doc()) != (metadata.post_type == PostType::Paid) {
            set_post_type(&mut editor, metadata.post_type)?;
        }
        Ok(Self::from_parts(config, editor, metadata))
    }

    fn from_parts(config: SessionConfig, editor: Editor, metadata: PostMetadata) -> Self {
        let engine = FormatEngine::new();
        let active = engine.active_formats(&editor);
        Self {
            autosave: Debouncer::new(config.autosave_delay()),
            autosaved_indicator: Debouncer::new(config.autosaved_indicator()),
            config,
            editor,
            engine,
            metadata,
            active,
            listeners: Vec::new(),
            next_listener_id: 0,
            closed: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn doc(&self) -> &Document {
        self.editor.doc()
    }

    pub fn metadata(&self) -> &PostMetadata {
        &self.metadata
    }

    pub fn active_formats(&self) -> &ActiveFormatSet {
        &self.active
    }

    pub fn focus_mode(&self) -> bool {
        self.engine.focus_mode()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Whether the "autosaved" indicator is showing.
    pub fn autosaved_shown(&self) -> bool {
        self.autosaved_indicator.is_pending()
    }

    pub fn slug(&self) -> String {
        self.metadata.slug()
    }

    pub fn url_preview(&self) -> String {
        url_preview(&self.config.host, &self.config.author_id, &self.slug())
    }

    pub fn snapshot_html(&self) -> String {
        to_html(self.editor.doc())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: SessionEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn schedule_autosave(&mut self, now: Instant) {
        if self.autosave.schedule(now, ()).is_some() {
            tracing::trace!("autosave rescheduled");
        }
    }

    fn refresh_active_formats(&mut self) {
        let active = self.engine.active_formats(&self.editor);
        if active != self.active {
            self.active = active.clone();
            self.emit(SessionEvent::ActiveFormatsChanged(active));
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>, now: Instant) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.metadata.title = title.into();
        self.schedule_autosave(now);
        Ok(())
    }

    pub fn set_subtitle(
        &mut self,
        subtitle: impl Into<String>,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.metadata.subtitle = subtitle.into();
        self.schedule_autosave(now);
        Ok(())
    }

    /// Type `text` at the selection, replacing it when expanded.
    pub fn insert_text(&mut self, text: &str, now: Instant) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.editor.focus();
        let before = self.editor.doc().clone();
        self.editor
            .run_command("text.insert", Some(json!({ "text": text })))?;
        if self.editor.doc() != &before {
            self.schedule_autosave(now);
        }
        self.refresh_active_formats();
        Ok(())
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.editor.set_selection(selection);
        self.refresh_active_formats();
        Ok(())
    }

    pub fn focus(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.editor.focus();
        self.refresh_active_formats();
        Ok(())
    }

    pub fn blur(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.editor.blur();
        self.refresh_active_formats();
        Ok(())
    }

    /// Apply a toolbar format. Document changes schedule an autosave.
    pub fn apply_format<P>(
        &mut self,
        id: FormatId,
        prompt: &mut P,
        now: Instant,
    ) -> Result<FormatOutcome, SessionError>
    where
        P: UrlPrompt + ?Sized,
    {
        self.ensure_open()?;
        let before = self.editor.doc().clone();
        let outcome = match self.engine.apply(&mut self.editor, id, prompt) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(format = %id, error = %err, "format rejected");
                return Err(err.into());
            }
        };
        if self.editor.doc() != &before {
            self.schedule_autosave(now);
        }
        self.refresh_active_formats();
        Ok(outcome)
    }

    /// Switch between free and paid, inserting or removing the paid marker.
    pub fn set_post_type(&mut self, post_type: PostType, now: Instant) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let changed_doc = set_post_type(&mut self.editor, post_type)?;
        let changed_type = self.metadata.post_type != post_type;
        self.metadata.post_type = post_type;

        if changed_doc || changed_type {
            self.schedule_autosave(now);
        }
        if changed_type {
            tracing::info!(post_type = %post_type, "post type changed");
            self.emit(SessionEvent::PostTypeChanged(post_type));
        }
        self.refresh_active_formats();
        Ok(changed_doc)
    }

    pub fn set_custom_slug_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.ensure_open()?;
        let title = self.metadata.title.clone();
        self.metadata.slug.set_custom_enabled(enabled, &title);
        Ok(())
    }

    pub fn set_custom_slug(&mut self, custom: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.metadata.slug.set_custom(custom);
        Ok(())
    }

    pub fn undo(&mut self, now: Instant) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let undone = self.editor.undo();
        self.after_history_step(undone, now)?;
        Ok(undone)
    }

    pub fn redo(&mut self, now: Instant) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let redone = self.editor.redo();
        self.after_history_step(redone, now)?;
        Ok(redone)
    }

    fn after_history_step(&mut self, stepped: bool, now: Instant) -> Result<(), SessionError> {
        if !stepped {
            return Ok(());
        }
        let wants_marker = self.metadata.post_type == PostType::Paid;
        if has_paid_marker(self.editor.doc()) != wants_marker {
            set_post_type(&mut self.editor, self.metadata.post_type)?;
        }
        self.schedule_autosave(now);
        self.refresh_active_formats();
        Ok(())
    }

    /// Build the draft or publish payload and notify listeners.
    pub fn submit(&mut self, kind: SubmitKind) -> Result<SubmitPayload, SessionError> {
        self.ensure_open()?;
        let payload = SubmitPayload::build(kind, &self.metadata, self.editor.doc());
        tracing::info!(
            kind = %kind,
            post_type = %payload.post_type,
            slug = %self.slug(),
            "post submitted"
        );
        self.emit(SessionEvent::Submitted(payload.clone()));
        Ok(payload)
    }

    /// Drive the session's timers. Returns the autosave that fired, if any.
    pub fn tick(&mut self, now: Instant) -> Result<Option<AutosaveSnapshot>, SessionError> {
        self.ensure_open()?;
        if self.autosaved_indicator.poll(now).is_some() {
            tracing::debug!("autosaved indicator cleared");
        }
        if self.autosave.poll(now).is_none() {
            return Ok(None);
        }

        let snapshot = AutosaveSnapshot::capture(&self.metadata, self.editor.doc());
        tracing::info!(title = %snapshot.title, "autosaved");
        self.autosaved_indicator.schedule(now, ());
        self.emit(SessionEvent::Autosaved(snapshot.clone()));
        Ok(Some(snapshot))
    }

    /// End the session: pending timers are cancelled and listeners detached.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.autosave.cancel();
        self.autosaved_indicator.cancel();
        self.listeners.clear();
        self.closed = true;
        tracing::debug!("editing session closed");
    }
}

impl Drop for PostEditorSession {
    fn drop(&mut self) {
        self.close();
    }
}
