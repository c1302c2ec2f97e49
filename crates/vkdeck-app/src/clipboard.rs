use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use vkdeck_core::{Clipboard, ClipboardError};

/// The desktop clipboard. The `arboard` handle is opened on first use and kept, since some
/// platforms drop copied text once the owning handle goes away.
#[derive(Clone, Default)]
pub struct SystemClipboard {
    handle: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// arboard blocks on the display server, so every access runs off the async workers.
    async fn with_handle<T, F>(&self, op: F) -> Result<T, ClipboardError>
    where
        T: Send + 'static,
        F: FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error> + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || {
            let mut slot = handle.lock();
            if slot.is_none() {
                let clipboard = arboard::Clipboard::new().map_err(|error| {
                    log::warn!("clipboard unavailable: {error}");
                    ClipboardError::Unavailable(error.to_string())
                })?;
                *slot = Some(clipboard);
            }
            match slot.as_mut() {
                Some(clipboard) => op(clipboard).map_err(map_error),
                None => Err(ClipboardError::Unavailable("no clipboard handle".to_owned())),
            }
        })
        .await
        .map_err(|error| ClipboardError::Failed(error.to_string()))?
    }
}

fn map_error(error: arboard::Error) -> ClipboardError {
    match error {
        arboard::Error::ClipboardNotSupported | arboard::Error::ClipboardOccupied => {
            ClipboardError::Unavailable(error.to_string())
        }
        other => ClipboardError::Failed(other.to_string()),
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_owned();
        self.with_handle(move |clipboard| clipboard.set_text(text))
            .await
    }

    async fn read_text(&self) -> Result<String, ClipboardError> {
        self.with_handle(|clipboard| clipboard.get_text()).await
    }
}
