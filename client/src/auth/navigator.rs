//! Browser navigation seam
//!
//! The core never touches the address bar itself; the embedding shell
//! supplies the navigation primitive. One trait serves the admin, staff, and
//! customer shells alike.

/// Navigation primitive supplied by the embedding shell
pub trait Navigator: Send + Sync {
    /// Full navigation (a new history entry)
    fn navigate(&self, url: &str);

    /// Replace the current history entry without navigating
    fn replace(&self, url: &str);
}
