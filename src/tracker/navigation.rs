use tokio::sync::watch;

/// Source of in-page navigation: holds the current route fragment and
/// notifies listeners whenever it changes.
#[derive(Clone)]
pub struct Navigator {
    fragment: watch::Sender<String>,
}

impl Navigator {
    pub fn new(initial: impl Into<String>) -> Self {
        let (fragment, _) = watch::channel(initial.into());
        Self { fragment }
    }

    pub fn current(&self) -> String {
        self.fragment.borrow().clone()
    }

    /// Move to `fragment`. Listeners are only woken when it differs from the
    /// current one.
    pub fn navigate(&self, fragment: impl Into<String>) -> bool {
        let fragment = fragment.into();
        self.fragment.send_if_modified(|current| {
            if *current == fragment {
                false
            } else {
                *current = fragment;
                true
            }
        })
    }

    /// A receiver that only observes navigations made after this call.
    pub fn listen(&self) -> watch::Receiver<String> {
        self.fragment.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listeners_see_changes_only() {
        let nav = Navigator::new("#/");
        let mut rx = nav.listen();
        assert!(!rx.has_changed().expect("open"));

        assert!(!nav.navigate("#/"));
        assert!(!rx.has_changed().expect("open"));

        assert!(nav.navigate("#/user-management"));
        rx.changed().await.expect("changed");
        assert_eq!(*rx.borrow_and_update(), "#/user-management");
        assert_eq!(nav.current(), "#/user-management");
    }
}
