//! Seam between the property lifecycle and a command's argument table.

use cle_types::error::Result;

/// Property-grammar operations on one command's argument table.
///
/// Property text is a sequence of `root.path="value"` assignments separated
/// by white space or new lines, with `#` starting a comment. Assignments
/// whose path is not below `root` belong to other commands and are skipped.
pub trait PropertyTable {
    /// Take property values as new defaults. Values already given on the
    /// command line are left alone.
    fn apply_properties(&mut self, text: &str, root: &str) -> Result<()>;

    /// Rewrite existing properties and return how many values changed.
    ///
    /// A bare `root.path` resets the property to its hard-coded default.
    /// Paths the table does not know are rejected.
    fn update_properties(&mut self, text: &str, root: &str) -> Result<usize>;

    /// Render the current defaults as property text below `root`, limited
    /// to `path` and its children when given. Properties without a value
    /// are written commented out.
    fn render_properties(&self, root: &str, path: Option<&str>) -> Result<String>;
}
