//! Background write session for streaming a graph into the cache.
//!
//! Large execution graphs are produced node by node as the build's
//! resolution walk progresses. A `WriteSession` moves the encoding work to
//! a worker thread: the producer hands over one top-level [`GraphNode`] at
//! a time and keeps going, while the worker encodes, compresses, and
//! writes through buffered I/O. Suspension points are between top-level
//! node writes; a single node's field sequence is always written in one
//! piece.
//!
//! If the session is aborted (explicitly or by dropping it) the partial
//! stream is discarded in full; there is no partial-node recovery.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use strata_codec::{write_end, write_node, WriteContext};
use strata_common::{ContentHash, Interner};
use strata_model::GraphNode;

use crate::error::CacheError;
use crate::store::EntryWriter;

/// What the worker receives from the producing side.
enum SessionMsg {
    /// One more top-level node to append.
    Node(GraphNode),
    /// The graph is complete; seal the entry.
    Finish,
}

/// Result of a completed write session.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// The entry key the graph was stored under.
    pub key: String,
    /// Checksum of the entry's compressed payload.
    pub checksum: ContentHash,
    /// Number of top-level nodes written.
    pub node_count: u64,
}

/// A handle to an in-flight graph write.
///
/// One session owns one identity-registry pass over one entry stream.
/// Sessions for different entries are independent and may run concurrently.
pub struct WriteSession {
    sender: Option<mpsc::Sender<SessionMsg>>,
    worker: Option<JoinHandle<Result<EntryInfo, CacheError>>>,
    key: String,
}

impl WriteSession {
    /// Spawns the worker for a fresh entry writer.
    pub(crate) fn spawn(writer: EntryWriter, interner: Arc<Interner>, key: String) -> Self {
        let (sender, receiver) = mpsc::channel::<SessionMsg>();
        let worker_key = key.clone();

        let worker = thread::spawn(move || -> Result<EntryInfo, CacheError> {
            let mut ctx = WriteContext::new(writer, &interner);
            let mut node_count = 0u64;
            loop {
                match receiver.recv() {
                    Ok(SessionMsg::Node(node)) => {
                        write_node(&mut ctx, &node)?;
                        node_count += 1;
                    }
                    Ok(SessionMsg::Finish) => break,
                    // Producer hung up without finishing: abort. Dropping
                    // the context drops the entry writer, which removes
                    // the partial file.
                    Err(mpsc::RecvError) => {
                        return Err(CacheError::SessionFailed {
                            reason: "session aborted before finish".to_string(),
                        });
                    }
                }
            }
            write_end(&mut ctx)?;
            let writer = ctx.finish()?;
            let checksum = writer.finish()?;
            Ok(EntryInfo {
                key: worker_key,
                checksum,
                node_count,
            })
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
            key,
        }
    }

    /// The entry key this session writes to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Appends one top-level node to the graph stream.
    ///
    /// Fails if the worker has already stopped (for example on an encoding
    /// error); call [`finish`](Self::finish) to learn why.
    pub fn push(&self, node: GraphNode) -> Result<(), CacheError> {
        let sender = self.sender.as_ref().ok_or_else(|| CacheError::SessionFailed {
            reason: "session already closed".to_string(),
        })?;
        sender
            .send(SessionMsg::Node(node))
            .map_err(|_| CacheError::SessionFailed {
                reason: "write worker stopped".to_string(),
            })
    }

    /// Seals the entry: writes the end sentinel and checksum trailer and
    /// renames the entry into place.
    pub fn finish(mut self) -> Result<EntryInfo, CacheError> {
        if let Some(sender) = self.sender.take() {
            // If the worker already died this send fails; join() below
            // surfaces the real error.
            let _ = sender.send(SessionMsg::Finish);
        }
        let worker = self.worker.take().ok_or_else(|| CacheError::SessionFailed {
            reason: "session already joined".to_string(),
        })?;
        match worker.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(CacheError::SessionFailed {
                reason: "write worker panicked".to_string(),
            }),
        }
    }

    /// Abandons the session, discarding the partial stream in full.
    pub fn abort(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing the channel without a Finish tells the worker to abort.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for WriteSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
