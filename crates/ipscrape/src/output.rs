use crate::ProgressSink;
use std::fmt::Display;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Writes one item per line to `path`, replacing any existing file and
/// reporting each item as it goes.
pub(crate) async fn write_lines<I, T>(
    path: &Path,
    items: I,
    progress: &dyn ProgressSink,
) -> std::io::Result<()>
where
    I: ExactSizeIterator<Item = T>,
    T: Display,
{
    let total = items.len();
    let mut writer = BufWriter::new(File::create(path).await?);
    for (idx, item) in items.enumerate() {
        writer.write_all(format!("{item}\n").as_bytes()).await?;
        progress.report(&format!("  From {idx} to {total} - {item}"), true);
    }
    writer.flush().await?;
    Ok(())
}

pub(crate) fn complete(progress: &dyn ProgressSink) {
    progress.report("  Complete \n", false);
}
