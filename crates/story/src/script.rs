//! Scripted editing steps, replayed against a session on a virtual clock.

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use buletin_post_core::{FormatId, FormatOutcome, Point, PostValue, Selection};
use buletin_post_editor::{
    AutosaveSnapshot, PostEditorSession, PostType, SubmitKind, SubmitPayload,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Title { text: String },
    Subtitle { text: String },
    Type { text: String },
    Select {
        anchor: Point,
        #[serde(default)]
        focus: Option<Point>,
    },
    Blur,
    Focus,
    Format {
        format: FormatId,
        /// Answer to the URL prompt for links and images.
        #[serde(default)]
        url: Option<String>,
    },
    PostType { post_type: PostType },
    /// `null` turns the override off.
    CustomSlug { slug: Option<String> },
    Wait { ms: u64 },
    Undo,
    Redo,
    Submit { kind: SubmitKind },
}

pub fn parse_script(raw: &str) -> Result<Vec<Step>> {
    serde_json::from_str(raw).context("invalid story script")
}

pub fn default_script() -> Vec<Step> {
    let point = |path: Vec<usize>, offset| Point::new(path, offset);
    vec![
        Step::Title {
            text: "Hello, World!".into(),
        },
        Step::Subtitle {
            text: "A first post".into(),
        },
        Step::Type {
            text: "Weekly notes".into(),
        },
        Step::Select {
            anchor: point(vec![0, 0], 0),
            focus: Some(point(vec![0, 0], 12)),
        },
        Step::Format {
            format: FormatId::Heading1,
            url: None,
        },
        Step::Format {
            format: FormatId::Bold,
            url: None,
        },
        Step::PostType {
            post_type: PostType::Paid,
        },
        Step::Type {
            text: "Members only".into(),
        },
        Step::Wait { ms: 3000 },
        Step::CustomSlug {
            slug: Some("weekly-notes".into()),
        },
        Step::Submit {
            kind: SubmitKind::Draft,
        },
        Step::Wait { ms: 2000 },
        Step::Submit {
            kind: SubmitKind::Publish,
        },
    ]
}

#[derive(Debug, Serialize)]
pub struct StoryReport {
    pub slug: String,
    pub url_preview: String,
    pub html: String,
    pub value: PostValue,
    pub autosaves: Vec<AutosaveSnapshot>,
    pub submissions: Vec<SubmitPayload>,
}

/// Replays steps. Time only moves on `wait`, and the session is ticked after
/// every step.
pub struct StoryRunner {
    session: PostEditorSession,
    start: Instant,
    elapsed: Duration,
    autosaves: Vec<AutosaveSnapshot>,
    submissions: Vec<SubmitPayload>,
}

impl StoryRunner {
    pub fn new(session: PostEditorSession) -> Self {
        Self {
            session,
            start: Instant::now(),
            elapsed: Duration::ZERO,
            autosaves: Vec::new(),
            submissions: Vec::new(),
        }
    }

    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<()> {
        for (ix, step) in steps.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("step {} ({step:?}) failed", ix + 1))?;
            let now = self.now();
            if let Some(snapshot) = self.session.tick(now)? {
                self.autosaves.push(snapshot);
            }
        }
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        let now = self.now();
        let session = &mut self.session;
        match step {
            Step::Title { text } => session.set_title(text.as_str(), now)?,
            Step::Subtitle { text } => session.set_subtitle(text.as_str(), now)?,
            Step::Type { text } => session.insert_text(text, now)?,
            Step::Select { anchor, focus } => session.set_selection(Selection {
                anchor: anchor.clone(),
                focus: focus.clone().unwrap_or_else(|| anchor.clone()),
            })?,
            Step::Blur => session.blur()?,
            Step::Focus => session.focus()?,
            Step::Format { format, url } => {
                let mut prompt = |_: &str, _: &str| url.clone();
                let outcome = session.apply_format(*format, &mut prompt, now)?;
                if outcome != FormatOutcome::Applied {
                    tracing::info!(format = %format, ?outcome, "format not applied");
                }
            }
            Step::PostType { post_type } => {
                session.set_post_type(*post_type, now)?;
            }
            Step::CustomSlug { slug: None } => session.set_custom_slug_enabled(false)?,
            Step::CustomSlug { slug: Some(slug) } => {
                session.set_custom_slug_enabled(true)?;
                session.set_custom_slug(slug.as_str())?;
            }
            Step::Wait { ms } => self.elapsed += Duration::from_millis(*ms),
            Step::Undo => {
                session.undo(now)?;
            }
            Step::Redo => {
                session.redo(now)?;
            }
            Step::Submit { kind } => {
                let payload = session.submit(*kind)?;
                self.submissions.push(payload);
            }
        }
        Ok(())
    }

    pub fn session(&self) -> &PostEditorSession {
        &self.session
    }

    pub fn finish(mut self) -> StoryReport {
        self.session.close();
        StoryReport {
            slug: self.session.slug(),
            url_preview: self.session.url_preview(),
            html: self.session.snapshot_html(),
            value: PostValue::from_document(self.session.doc().clone()),
            autosaves: self.autosaves,
            submissions: self.submissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use buletin_post_editor::SessionConfig;

    use super::*;

    #[test]
    fn default_script_runs_to_completion() {
        let mut runner = StoryRunner::new(PostEditorSession::new(SessionConfig::default()));
        runner.run(&default_script()).unwrap();
        let report = runner.finish();

        assert_eq!(report.slug, "weekly-notes");
        assert_eq!(report.submissions.len(), 2);
        assert!(report.submissions.iter().all(|p| p.has_paid_marker));
        assert_eq!(report.autosaves.len(), 1);
        assert!(report.html.starts_with("<h1><strong>Weekly notes</strong></h1>"));
        assert!(report.html.contains("<div class=\"paid-content\"><p>Members only</p></div>"));
    }

    #[test]
    fn parses_json_steps() {
        let steps = parse_script(
            r#"[
                { "op": "type", "text": "Hi" },
                { "op": "select", "anchor": { "path": [0, 0], "offset": 0 } },
                { "op": "format", "format": "h2" },
                { "op": "format", "format": "link", "url": "https://buletin.co" },
                { "op": "custom_slug", "slug": null },
                { "op": "post_type", "post_type": "paid" },
                { "op": "submit", "kind": "draft" }
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 7);
        assert!(matches!(
            steps[2],
            Step::Format {
                format: FormatId::Heading2,
                url: None
            }
        ));
    }
}
