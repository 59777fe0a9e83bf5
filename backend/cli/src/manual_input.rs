use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use snapsolve_core::ManualInput;

/// Asks on stderr and reads one line. EOF or a blank line means dismissed.
pub struct LineManualInput<R> {
    reader: Mutex<R>,
}

impl LineManualInput<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> LineManualInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

#[async_trait]
impl<R> ManualInput for LineManualInput<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn request_text(&self, reason: &str) -> Option<String> {
        eprintln!("No text could be read from the selection ({reason}).");
        eprintln!("Type the question and press Enter (empty line to cancel):");

        let mut line = String::new();
        let mut reader = self.reader.lock().await;
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
        }
    }
}
