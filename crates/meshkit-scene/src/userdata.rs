/// Typed replacement for the original's single opaque `void *udata` slot,
/// which the C library overloaded for three unrelated purposes: a
/// host-owned GPU handle, a transient loader index, and the immediate-mode
/// builder's scratch state. The last use is gone entirely in this port (see
/// [`crate::builder`]); the other two become explicit variants instead of
/// one untyped pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserData {
    #[default]
    None,
    /// An opaque handle owned by the embedding application (e.g. a GPU
    /// resource id).
    Host(u64),
    /// Scratch bookkeeping a codec wants to keep attached to an entity
    /// across the lifetime of a single load/save call.
    Loader(u64),
}
