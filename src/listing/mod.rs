//! Remote tree enumeration.
//!
//! The walk is depth-first and pre-order: when a page contains a directory,
//! that directory is fully listed before the rest of the page is consumed.
//! It runs on one task with no concurrency, so pagination state and output
//! order stay coherent.

use std::collections::VecDeque;

use crate::protocol::{join_remote, ListItem, OpenListClient, RemoteFileEntry};

/// Walks a remote directory tree page by page.
pub struct Lister {
    client: OpenListClient,
    page_size: u32,
}

/// A directory being listed, suspended while a child directory is walked.
struct Frame {
    path: String,
    next_page: u32,
    pending: VecDeque<ListItem>,
    exhausted: bool,
    files: usize,
}

impl Frame {
    fn new(path: String) -> Self {
        Self {
            path,
            next_page: 1,
            pending: VecDeque::new(),
            exhausted: false,
            files: 0,
        }
    }
}

impl Lister {
    pub fn new(client: OpenListClient, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    /// Every file reachable below `root`, in pre-order.
    ///
    /// Never fails: a directory whose page request fails stops contributing
    /// at that point, and everything gathered so far is kept.
    pub async fn list(&self, root: &str) -> Vec<RemoteFileEntry> {
        let mut files = Vec::new();
        let mut stack = vec![Frame::new(root.to_string())];
        tracing::debug!("Listing {}", root);

        while let Some(frame) = stack.last_mut() {
            if let Some(item) = frame.pending.pop_front() {
                let full_path = join_remote(&frame.path, &item.name);
                if item.is_dir {
                    tracing::debug!("Entering {}", full_path);
                    stack.push(Frame::new(full_path));
                } else {
                    frame.files += 1;
                    files.push(RemoteFileEntry {
                        name: item.name,
                        path: full_path,
                        size: item.size,
                    });
                }
                continue;
            }

            if frame.exhausted {
                tracing::debug!("Finished {}: {} files", frame.path, frame.files);
                stack.pop();
                continue;
            }

            self.fetch_next_page(frame).await;
        }

        files
    }

    /// Load the frame's next page into `pending`, or mark it exhausted.
    async fn fetch_next_page(&self, frame: &mut Frame) {
        let page = frame.next_page;
        tracing::debug!("Requesting page {} of {}", page, frame.path);

        match self.client.list_page(&frame.path, page, self.page_size).await {
            Ok(items) if items.is_empty() => {
                frame.exhausted = true;
            }
            Ok(items) => {
                tracing::debug!("Page {} of {}: {} items", page, frame.path, items.len());
                frame.exhausted = items.len() < self.page_size as usize;
                frame.next_page += 1;
                frame.pending.extend(items);
            }
            Err(e) => {
                tracing::error!("Listing page {} of {} failed: {}", page, frame.path, e);
                frame.exhausted = true;
            }
        }
    }
}
