//! Replay of a recorded raw frame log (`*.raw.jsonl`, one JSON frame per line).

use std::path::Path;

use futures::Stream;
use tracing::info;

use crate::error::{AppResult, RowerError};
use crate::measurement::RawFrame;

/// Read every frame of a JSON-lines capture. Blank lines are skipped.
pub async fn load_frames(path: impl AsRef<Path>) -> AppResult<Vec<RawFrame>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let frames = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<RawFrame>(line).map_err(|e| {
                RowerError::Source(format!("{}:{}: {}", path.display(), index + 1, e))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    info!(path = %path.display(), frames = frames.len(), "Loaded telemetry capture");
    Ok(frames)
}

/// Stream of the frames in a JSON-lines capture, emitted as fast as they are consumed.
///
/// The file is parsed up front, so a malformed line fails here rather than mid-session.
pub async fn replay_frames(
    path: impl AsRef<Path>,
) -> AppResult<impl Stream<Item = RawFrame> + Send + 'static> {
    let frames = load_frames(path).await?;
    Ok(futures::stream::iter(frames))
}
