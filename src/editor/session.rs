//! Editing session and the controller that drives edit requests.

use crate::editor::state::{EditOutcome, EditStatus, UploadOutcome};
use crate::error::Result;
use crate::image::codec::{declared_type_for_path, encode_file, is_image_type, EncodedImage};
use crate::image::EditClient;
use std::path::{Path, PathBuf};

/// Quick-action prompts offered next to the prompt input.
pub const SUGGESTED_PROMPTS: [&str; 6] = [
    "Add a cyberpunk neon filter",
    "Turn into a pencil sketch",
    "Remove the background",
    "Make it look like a vintage 1980s photo",
    "Add fireworks in the sky",
    "Convert to an oil painting",
];

const INVALID_FILE_MESSAGE: &str = "Please upload a valid image file.";

/// An accepted generate action, waiting for the client's answer.
#[derive(Debug, Clone)]
#[must_use = "a pending edit should be completed with Editor::complete_edit"]
pub struct PendingEdit {
    session_id: u64,
    image: EncodedImage,
    prompt: String,
}

impl PendingEdit {
    /// Id of the session that issued the request.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Image to edit.
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }

    /// Instruction to send.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// State of one uploaded image, from upload until discard.
#[derive(Debug, Clone)]
pub struct EditSession {
    id: u64,
    original: EncodedImage,
    current: EncodedImage,
    pending_prompt: String,
    status: EditStatus,
    revision: u64,
    show_original: bool,
}

impl EditSession {
    fn new(id: u64, image: EncodedImage) -> Self {
        Self {
            id,
            current: image.clone(),
            original: image,
            pending_prompt: String::new(),
            status: EditStatus::Idle,
            revision: 0,
            show_original: false,
        }
    }

    /// Session id, unique within its editor.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The uploaded image.
    pub fn original(&self) -> &EncodedImage {
        &self.original
    }

    /// The latest image, i.e. the last applied edit or the original.
    pub fn current(&self) -> &EncodedImage {
        &self.current
    }

    /// The prompt the user is typing.
    pub fn prompt(&self) -> &str {
        &self.pending_prompt
    }

    /// Current status.
    pub fn status(&self) -> &EditStatus {
        &self.status
    }

    /// Number of edits applied since upload or the last reset.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if `current` differs from the original upload.
    pub fn has_edits(&self) -> bool {
        self.revision > 0
    }

    /// Replaces the pending prompt.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.pending_prompt = prompt.into();
    }

    /// Copies one of [`SUGGESTED_PROMPTS`] into the prompt.
    pub fn apply_suggestion(&mut self, index: usize) -> bool {
        match SUGGESTED_PROMPTS.get(index) {
            Some(prompt) => {
                self.set_prompt(*prompt);
                true
            }
            None => false,
        }
    }

    /// Returns true if a generate action would be accepted.
    pub fn can_generate(&self) -> bool {
        !self.pending_prompt.trim().is_empty() && !self.status.is_processing()
    }

    /// Returns true if reset would restore the original.
    pub fn can_reset(&self) -> bool {
        self.has_edits() && !self.status.is_processing()
    }

    fn begin_edit(&mut self) -> Option<PendingEdit> {
        if !self.can_generate() {
            return None;
        }
        self.status = EditStatus::Processing;
        Some(PendingEdit {
            session_id: self.id,
            image: self.current.clone(),
            prompt: self.pending_prompt.clone(),
        })
    }

    fn finish(&mut self, result: Result<EncodedImage>) -> EditOutcome {
        match result {
            Ok(image) => {
                self.current = image;
                self.revision += 1;
                self.status = EditStatus::Success;
                self.pending_prompt.clear();
                EditOutcome::Applied
            }
            Err(e) => {
                // The prompt is kept so it can be retried.
                tracing::warn!(session = self.id, "edit failed: {e}");
                let message = e.user_message();
                self.status = EditStatus::Error {
                    message: message.clone(),
                };
                EditOutcome::Failed { message }
            }
        }
    }

    /// Clears a visible error. Returns false if there was none.
    pub fn dismiss_error(&mut self) -> bool {
        if self.status.error_message().is_none() {
            return false;
        }
        self.status = EditStatus::Idle;
        true
    }

    /// Restores the original image. Not available while processing.
    pub fn reset(&mut self) -> bool {
        if !self.can_reset() {
            return false;
        }
        self.current = self.original.clone();
        self.revision = 0;
        self.status = EditStatus::Idle;
        true
    }

    /// Returns true if the original is being displayed instead of the edit.
    pub fn show_original(&self) -> bool {
        self.show_original
    }

    /// Chooses which image [`displayed_image`](Self::displayed_image) returns.
    pub fn set_show_original(&mut self, show: bool) {
        self.show_original = show;
    }

    /// Flips the comparison toggle and returns the new value.
    pub fn toggle_comparison(&mut self) -> bool {
        self.show_original = !self.show_original;
        self.show_original
    }

    /// The image to display.
    pub fn displayed_image(&self) -> &EncodedImage {
        if self.show_original {
            &self.original
        } else {
            &self.current
        }
    }

    /// Writes the current image into `dir` and returns its path.
    pub fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.current.export(dir)
    }
}

/// Owns at most one [`EditSession`] and reconciles edit results into it.
///
/// One request may be outstanding at a time. A result that arrives after its
/// session was discarded or replaced is dropped.
#[derive(Debug, Default)]
pub struct Editor {
    session: Option<EditSession>,
    next_session_id: u64,
}

impl Editor {
    /// Creates an editor waiting for an upload.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active session, if an image has been uploaded.
    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Mutable access to the active session.
    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    /// Starts a session for an already encoded image, replacing any
    /// existing one.
    pub fn open(&mut self, image: EncodedImage) -> &mut EditSession {
        self.next_session_id += 1;
        tracing::debug!(
            session = self.next_session_id,
            content_type = image.content_type(),
            "opened editing session"
        );
        self.session.insert(EditSession::new(self.next_session_id, image))
    }

    /// Offers a user-selected file to the editor.
    ///
    /// Files that do not declare an image type are rejected with a message.
    /// A read failure is returned as an error and leaves the editor as it was.
    pub fn upload(&mut self, path: impl AsRef<Path>) -> Result<UploadOutcome> {
        let path = path.as_ref();
        if !is_image_type(declared_type_for_path(path)) {
            return Ok(UploadOutcome::Rejected {
                message: INVALID_FILE_MESSAGE.to_string(),
            });
        }

        let image = encode_file(path)?;
        self.open(image);
        Ok(UploadOutcome::Accepted)
    }

    /// Ends the session and returns to the upload step.
    pub fn discard(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                tracing::debug!(session = session.id, "discarded editing session");
                true
            }
            None => false,
        }
    }

    /// Accepts a generate action if the guard allows it.
    ///
    /// Returns `None`, without touching any state, when there is no session,
    /// the prompt is blank or a request is already outstanding.
    pub fn begin_edit(&mut self) -> Option<PendingEdit> {
        self.session.as_mut()?.begin_edit()
    }

    /// Applies the client's answer to the session that issued `pending`.
    pub fn complete_edit(
        &mut self,
        pending: PendingEdit,
        result: Result<EncodedImage>,
    ) -> EditOutcome {
        match self.session.as_mut() {
            Some(session) if session.id == pending.session_id && session.status.is_processing() => {
                session.finish(result)
            }
            _ => {
                tracing::warn!(
                    session = pending.session_id,
                    "dropping edit result for a discarded session"
                );
                EditOutcome::Dropped
            }
        }
    }

    /// Runs one generate action against `client`.
    ///
    /// Returns `None` if the guard rejected the action; no request is sent.
    pub async fn generate<C>(&mut self, client: &C) -> Option<EditOutcome>
    where
        C: EditClient + ?Sized,
    {
        let pending = self.begin_edit()?;
        let result = client.request_edit(pending.image(), pending.prompt()).await;
        Some(self.complete_edit(pending, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use crate::image::GeminiEditClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];

    enum Reply {
        Image(&'static str, &'static str),
        Refusal(&'static str),
        Empty,
    }

    struct FakeClient {
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EditClient for FakeClient {
        async fn request_edit(&self, _image: &EncodedImage, prompt: &str) -> Result<EncodedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Reply::Image(mime, data) => Ok(EncodedImage::from_base64(data, mime)),
                Reply::Refusal(text) => Err(EditError::Refusal(text.into())),
                Reply::Empty => Err(EditError::EmptyResponse("No image generated.".into())),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn editor_with_photo() -> Editor {
        let mut editor = Editor::new();
        editor.open(EncodedImage::from_bytes(&JPEG_MAGIC, "image/jpeg"));
        editor
    }

    #[tokio::test]
    async fn test_successful_edit_replaces_current() {
        let mut editor = editor_with_photo();
        let client = FakeClient::new(Reply::Image("image/png", "Zm9v"));

        editor.session_mut().unwrap().set_prompt("add fireworks");
        let outcome = editor.generate(&client).await;
        assert_eq!(outcome, Some(EditOutcome::Applied));

        let session = editor.session().unwrap();
        assert_eq!(session.status(), &EditStatus::Success);
        assert_eq!(session.current().content_type(), "image/png");
        assert!(session
            .current()
            .content()
            .starts_with("data:image/png;base64,Zm9v"));
        assert_eq!(session.original().content_type(), "image/jpeg");
        assert_eq!(session.prompt(), "");
        assert!(session.has_edits());
        assert_eq!(client.prompts.lock().unwrap().as_slice(), ["add fireworks"]);
    }

    #[tokio::test]
    async fn test_refusal_sets_error_and_keeps_prompt() {
        let mut editor = editor_with_photo();
        let client = FakeClient::new(Reply::Refusal("blocked by safety filters"));

        editor.session_mut().unwrap().set_prompt("add fireworks");
        let outcome = editor.generate(&client).await.unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Failed {
                message: "Gemini API response: blocked by safety filters".into()
            }
        );

        let session = editor.session().unwrap();
        assert_eq!(
            session.status().error_message(),
            Some("Gemini API response: blocked by safety filters")
        );
        assert_eq!(session.prompt(), "add fireworks");
        assert!(!session.has_edits());
    }

    #[tokio::test]
    async fn test_blank_prompt_issues_no_request() {
        let mut editor = editor_with_photo();
        let client = FakeClient::new(Reply::Image("image/png", "Zm9v"));

        assert_eq!(editor.generate(&client).await, None);
        editor.session_mut().unwrap().set_prompt("   \t\n");
        assert_eq!(editor.generate(&client).await, None);

        assert_eq!(client.calls(), 0);
        assert_eq!(editor.session().unwrap().status(), &EditStatus::Idle);
    }

    #[tokio::test]
    async fn test_generate_without_session_is_noop() {
        let mut editor = Editor::new();
        let client = FakeClient::new(Reply::Empty);
        assert_eq!(editor.generate(&client).await, None);
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_processing_blocks_second_generate() {
        let mut editor = editor_with_photo();
        editor.session_mut().unwrap().set_prompt("add fireworks");

        let pending = editor.begin_edit().unwrap();
        assert!(editor.session().unwrap().status().is_processing());
        assert!(editor.begin_edit().is_none());

        let outcome = editor.complete_edit(pending, Ok(EncodedImage::from_base64("Zm9v", "image/png")));
        assert_eq!(outcome, EditOutcome::Applied);
    }

    #[tokio::test]
    async fn test_reset_restores_original() {
        let mut editor = editor_with_photo();
        let original = editor.session().unwrap().original().clone();
        let client = FakeClient::new(Reply::Image("image/png", "Zm9v"));

        assert!(!editor.session_mut().unwrap().reset());

        editor.session_mut().unwrap().set_prompt("add fireworks");
        editor.generate(&client).await;

        let session = editor.session_mut().unwrap();
        assert!(session.can_reset());
        assert!(session.reset());
        assert_eq!(session.current(), &original);
        assert_eq!(session.current().decode().unwrap(), JPEG_MAGIC);
        assert_eq!(session.status(), &EditStatus::Idle);
        assert!(!session.has_edits());
    }

    #[test]
    fn test_reset_refused_while_processing() {
        let mut editor = editor_with_photo();
        let session = editor.session_mut().unwrap();
        session.set_prompt("one");
        let first = session.begin_edit().unwrap();
        session.finish(Ok(EncodedImage::from_base64("Zm9v", "image/png")));
        drop(first);

        session.set_prompt("two");
        let _pending = session.begin_edit().unwrap();
        assert!(session.has_edits());
        assert!(!session.reset());
        assert_eq!(session.current().payload(), "Zm9v");
    }

    #[tokio::test]
    async fn test_error_dismissed_or_replaced_by_new_generate() {
        let mut editor = editor_with_photo();
        editor.session_mut().unwrap().set_prompt("add fireworks");
        editor.generate(&FakeClient::new(Reply::Empty)).await;

        let session = editor.session_mut().unwrap();
        assert_eq!(
            session.status().error_message(),
            Some("Failed to generate image")
        );
        assert!(session.dismiss_error());
        assert_eq!(session.status(), &EditStatus::Idle);
        assert!(!session.dismiss_error());

        editor.generate(&FakeClient::new(Reply::Empty)).await;
        let pending = editor.begin_edit().unwrap();
        assert_eq!(editor.session().unwrap().status(), &EditStatus::Processing);
        assert_eq!(pending.prompt(), "add fireworks");
    }

    #[test]
    fn test_malformed_response_shows_generic_message() {
        let mut editor = editor_with_photo();
        editor.session_mut().unwrap().set_prompt("add fireworks");
        let pending = editor.begin_edit().unwrap();

        let outcome = editor.complete_edit(
            pending,
            Err(EditError::MalformedResponse("No content parts returned.".into())),
        );
        assert_eq!(
            outcome,
            EditOutcome::Failed {
                message: "Failed to generate image".into()
            }
        );
        assert_eq!(editor.session().unwrap().prompt(), "add fireworks");
    }

    #[test]
    fn test_result_after_discard_is_dropped() {
        let mut editor = editor_with_photo();
        editor.session_mut().unwrap().set_prompt("add fireworks");
        let pending = editor.begin_edit().unwrap();

        assert!(editor.discard());
        let outcome = editor.complete_edit(pending, Ok(EncodedImage::from_base64("Zm9v", "image/png")));
        assert_eq!(outcome, EditOutcome::Dropped);
        assert!(editor.session().is_none());
    }

    #[test]
    fn test_result_for_replaced_session_is_dropped() {
        let mut editor = editor_with_photo();
        editor.session_mut().unwrap().set_prompt("add fireworks");
        let pending = editor.begin_edit().unwrap();

        editor.open(EncodedImage::from_base64("YmFy", "image/png"));
        let outcome = editor.complete_edit(pending, Ok(EncodedImage::from_base64("Zm9v", "image/png")));
        assert_eq!(outcome, EditOutcome::Dropped);

        let session = editor.session().unwrap();
        assert_eq!(session.current().payload(), "YmFy");
        assert_eq!(session.status(), &EditStatus::Idle);
    }

    #[test]
    fn test_comparison_toggle_is_display_only() {
        let mut editor = editor_with_photo();
        let session = editor.session_mut().unwrap();
        session.finish(Ok(EncodedImage::from_base64("Zm9v", "image/png")));

        assert_eq!(session.displayed_image().content_type(), "image/png");
        assert!(session.toggle_comparison());
        assert_eq!(session.displayed_image().content_type(), "image/jpeg");
        assert_eq!(session.status(), &EditStatus::Success);
        session.set_show_original(false);
        assert_eq!(session.displayed_image().payload(), "Zm9v");
    }

    #[test]
    fn test_apply_suggestion() {
        let mut editor = editor_with_photo();
        let session = editor.session_mut().unwrap();
        assert!(session.apply_suggestion(4));
        assert_eq!(session.prompt(), "Add fireworks in the sky");
        assert!(!session.apply_suggestion(SUGGESTED_PROMPTS.len()));
        assert_eq!(session.prompt(), "Add fireworks in the sky");
    }

    #[tokio::test]
    async fn test_missing_api_key_surfaces_as_error_state() {
        let mut editor = editor_with_photo();
        let client = GeminiEditClient::builder().base_url("http://127.0.0.1:9").build();

        editor.session_mut().unwrap().set_prompt("add fireworks");
        editor.generate(&client).await;
        assert_eq!(
            editor.session().unwrap().status().error_message(),
            Some("API Key is missing. Please configure the environment.")
        );
    }

    #[test]
    fn test_upload_accepts_image_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, JPEG_MAGIC).unwrap();

        let mut editor = Editor::new();
        assert_eq!(editor.upload(&path).unwrap(), UploadOutcome::Accepted);
        let session = editor.session().unwrap();
        assert_eq!(session.original().content_type(), "image/jpeg");
        assert!(session.original().content().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_upload_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not an image").unwrap();

        let mut editor = Editor::new();
        let outcome = editor.upload(&path).unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Rejected {
                message: "Please upload a valid image file.".into()
            }
        );
        assert!(editor.session().is_none());
    }

    #[test]
    fn test_upload_read_failure_creates_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = Editor::new();
        let err = editor.upload(dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, EditError::Read(_)));
        assert!(editor.session().is_none());
    }

    #[test]
    fn test_download_writes_current() {
        let dir = tempfile::tempdir().unwrap();

        let mut editor = editor_with_photo();
        let session = editor.session_mut().unwrap();
        session.finish(Ok(EncodedImage::from_base64("Zm9v", "image/png")));
        let path = session.download(dir.path()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"foo");
    }
}
