pub struct HelloState {
    pub ready: (
        tokio::sync::watch::Sender<bool>,
        tokio::sync::watch::Receiver<bool>,
    ),
}

impl Default for HelloState {
    fn default() -> Self {
        Self::new()
    }
}

impl HelloState {
    pub fn new() -> Self {
        HelloState {
            ready: tokio::sync::watch::channel(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.1.borrow()
    }
}
