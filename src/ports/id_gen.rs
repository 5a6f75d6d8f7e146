//! ID generator port for producing unique identifiers.

/// Generates unique identifiers.
///
/// Used once per process to name the report directory that every audit
/// document of this process lands in.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
