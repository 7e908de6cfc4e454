use super::shell::ShellId;

slotmap::new_key_type! {
    /// Unique identifier for a solid in the topology store.
    pub struct SolidId;
}

/// A bounded volume enclosed by one or more shells.
///
/// The first shell is the outer skin; additional shells bound internal
/// voids (a hollow part).
#[derive(Debug, Clone)]
pub struct SolidData {
    /// The outer shell of the solid.
    pub outer_shell: ShellId,
    /// Inner shells representing voids within the solid.
    pub inner_shells: Vec<ShellId>,
}

impl SolidData {
    /// Iterates the outer shell followed by the void shells.
    pub fn shells(&self) -> impl Iterator<Item = ShellId> + '_ {
        std::iter::once(self.outer_shell).chain(self.inner_shells.iter().copied())
    }
}
