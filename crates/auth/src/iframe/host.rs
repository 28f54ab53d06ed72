//! In-memory frame host.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use oidcrp_core::auth::{FrameHandle, FrameHost, Result};
use tracing::debug;
use url::Url;

/// A message posted into a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub frame: String,
    pub message: String,
    pub target_origin: String,
}

#[derive(Debug, Default)]
struct Inner {
    frames: HashSet<String>,
    created: Vec<String>,
    navigations: Vec<(String, Url)>,
    messages: Vec<PostedMessage>,
}

/// Frame host that records what it is asked to do.
///
/// Used by headless hosts (the CLI) and tests. A real embedding forwards
/// these calls to its webview.
#[derive(Debug, Clone, Default)]
pub struct RecordingFrameHost {
    inner: Arc<RwLock<Inner>>,
}

impl RecordingFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of frames in creation order.
    pub fn created_frames(&self) -> Vec<String> {
        self.read(|inner| inner.created.clone())
    }

    pub fn navigations(&self) -> Vec<(String, Url)> {
        self.read(|inner| inner.navigations.clone())
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.read(|inner| inner.messages.clone())
    }

    /// Last URL loaded into a frame.
    pub fn last_navigation(&self, frame_id: &str) -> Option<Url> {
        self.read(|inner| {
            inner
                .navigations
                .iter()
                .rev()
                .find(|(id, _)| id == frame_id)
                .map(|(_, url)| url.clone())
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl FrameHost for RecordingFrameHost {
    fn get_or_create_frame(&self, id: &str) -> Result<FrameHandle> {
        self.write(|inner| {
            if inner.frames.insert(id.to_string()) {
                debug!("Created frame {}", id);
                inner.created.push(id.to_string());
            }
        });
        Ok(FrameHandle::new(id))
    }

    fn navigate(&self, frame: &FrameHandle, url: &Url) -> Result<()> {
        self.write(|inner| inner.navigations.push((frame.id().to_string(), url.clone())));
        Ok(())
    }

    fn post_message(&self, frame: &FrameHandle, message: &str, target_origin: &str) -> Result<()> {
        self.write(|inner| {
            inner.messages.push(PostedMessage {
                frame: frame.id().to_string(),
                message: message.to_string(),
                target_origin: target_origin.to_string(),
            })
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_created_once() {
        let host = RecordingFrameHost::new();

        let first = host.get_or_create_frame("renew").unwrap();
        let second = host.get_or_create_frame("renew").unwrap();

        assert_eq!(first, second);
        assert_eq!(host.created_frames(), vec!["renew".to_string()]);
    }

    #[test]
    fn test_records_navigations_and_messages() {
        let host = RecordingFrameHost::new();
        let frame = host.get_or_create_frame("check").unwrap();
        let url = Url::parse("https://idp.example.com/checksession").unwrap();

        host.navigate(&frame, &url).unwrap();
        host.post_message(&frame, "spa abc", "https://idp.example.com").unwrap();

        assert_eq!(host.last_navigation("check"), Some(url));
        assert_eq!(host.last_navigation("other"), None);
        assert_eq!(host.messages()[0].message, "spa abc");
    }
}
