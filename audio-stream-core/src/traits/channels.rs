use std::path::Path;

use crate::models::summary::UploadOutcome;

/// Outbound transport for captured PCM.
///
/// Fire-and-forget: back-pressure and retries belong to the transport.
pub trait OutboundChannel: Send + Sync {
    fn send(&self, pcm: &[u8]);
}

/// Offline upload queue that receives the finished capture file.
///
/// The file is deleted after `submit` returns, so implementations must copy
/// or upload it before returning.
pub trait UploadQueue: Send + Sync {
    fn submit(&self, file: &Path) -> UploadOutcome;
}
